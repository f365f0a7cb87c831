//! HTTP contract tests for the Sweet Shop storefront.
//!
//! The full router is driven in-process with `tower::ServiceExt::oneshot`
//! over the in-memory storage fixture, so no database or server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sweet-shop-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use sweet_shop_core::{Email, Role, Username};
use sweet_shop_storefront::config::{AuthConfig, SentryConfig, StorefrontConfig};
use sweet_shop_storefront::db::memory::MemoryStore;
use sweet_shop_storefront::services::auth::create_account;
use sweet_shop_storefront::state::AppState;

/// Signing secret used by every test app.
const TEST_JWT_SECRET: &str = "kV9#qL2!zX7@mN4$wR8%tY6^uI3&oP1*";

/// A storefront router backed by a fresh in-memory store.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, or a JSON string holding a non-JSON body.
    pub body: Value,
}

impl TestResponse {
    /// The `data` field of a success envelope.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    /// The `error` field of a failure envelope.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), Arc::clone(&store) as _);
        Self {
            router: sweet_shop_storefront::app(state),
            store,
        }
    }

    /// Send a request with an optional bearer token and JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("valid request")).await
    }

    /// Send a prebuilt request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register a regular account and return its token.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "secret123",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        token_of(&response)
    }

    /// Create an admin directly in storage, log in and return its token.
    pub async fn admin(&self, username: &str) -> String {
        let email = format!("{username}@example.com");
        create_account(
            self.store.as_ref(),
            Username::parse(username).expect("valid username"),
            Email::parse(&email).expect("valid email"),
            "secret123",
            Role::Admin,
        )
        .await
        .expect("admin created");

        let response = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": "secret123" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        token_of(&response)
    }

    /// Create a chocolate sweet and return its id.
    pub async fn create_sweet(&self, token: &str, name: &str, price: f64, quantity: i32) -> i64 {
        let response = self
            .post(
                "/api/sweets",
                Some(token),
                json!({
                    "name": name,
                    "description": format!("{name} from the test kitchen"),
                    "price": price,
                    "category": "chocolate",
                    "quantity": quantity,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.data()["id"].as_i64().expect("numeric id")
    }

    /// Current stock of a sweet.
    pub async fn stock_of(&self, id: i64) -> i64 {
        let response = self.get(&format!("/api/sweets/{id}"), None).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.data()["quantity"].as_i64().expect("numeric quantity")
    }
}

/// The bearer token from an auth response.
#[must_use]
pub fn token_of(response: &TestResponse) -> String {
    response.data()["token"]
        .as_str()
        .expect("token in response")
        .to_owned()
}

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused".to_owned()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        auth: AuthConfig {
            jwt_secret: SecretString::from(TEST_JWT_SECRET.to_owned()),
            token_ttl: chrono::Duration::days(7),
        },
        cors_origin: None,
        log_json: false,
        sentry: SentryConfig::default(),
    }
}

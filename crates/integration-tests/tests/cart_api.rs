//! Cart and checkout contract tests.

use axum::http::StatusCode;
use serde_json::json;

use sweet_shop_integration_tests::TestApp;

#[tokio::test]
async fn test_cart_requires_auth() {
    let app = TestApp::new();
    assert_eq!(app.get("/api/cart", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.post("/api/cart/checkout", None, json!({})).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_empty_cart_view() {
    let app = TestApp::new();
    let token = app.register("shopper").await;

    let response = app.get("/api/cart", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["cart"]["items"], json!([]));
    assert_eq!(response.data()["summary"]["totalItems"], 0);
    assert_eq!(response.data()["summary"]["totalPrice"], json!(0.0));
    assert_eq!(response.data()["summary"]["itemCount"], 0);
}

#[tokio::test]
async fn test_add_items_and_totals() {
    let app = TestApp::new();
    let token = app.register("shopper").await;
    let fudge = app.create_sweet(&token, "Fudge", 2.5, 10).await;
    let mint = app.create_sweet(&token, "Mint", 1.25, 10).await;

    let first = app
        .post("/api/cart", Some(&token), json!({ "sweetId": fudge, "quantity": 2 }))
        .await;
    assert_eq!(first.status, StatusCode::OK, "{:?}", first.body);
    assert_eq!(first.body["message"], "Item added to cart successfully");
    assert_eq!(first.data()["summary"]["totalPrice"], json!(5.0));

    let second = app
        .post("/api/cart", Some(&token), json!({ "sweetId": mint }))
        .await;
    let data = second.data();
    assert_eq!(data["summary"]["totalItems"], 3);
    assert_eq!(data["summary"]["totalPrice"], json!(6.25));
    assert_eq!(data["summary"]["itemCount"], 2);
    assert_eq!(data["cart"]["items"][0]["sweet"]["name"], "Fudge");
    assert_eq!(data["cart"]["items"][1]["quantity"], 1);
}

#[tokio::test]
async fn test_add_rejects_bad_input() {
    let app = TestApp::new();
    let token = app.register("shopper").await;
    let fudge = app.create_sweet(&token, "Fudge", 2.5, 5).await;

    let no_id = app.post("/api/cart", Some(&token), json!({})).await;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_id.error(), "Sweet ID is required.");

    let bad_id = app
        .post("/api/cart", Some(&token), json!({ "sweetId": "xyz" }))
        .await;
    assert_eq!(bad_id.error(), "Invalid sweet ID.");

    let missing = app
        .post("/api/cart", Some(&token), json!({ "sweetId": 9999 }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    app.post("/api/cart", Some(&token), json!({ "sweetId": fudge, "quantity": 4 }))
        .await;
    let over = app
        .post("/api/cart", Some(&token), json!({ "sweetId": fudge, "quantity": 2 }))
        .await;
    assert_eq!(over.status, StatusCode::BAD_REQUEST);
    assert_eq!(over.error(), "Insufficient stock.");
    assert_eq!(over.body["available"], 5);
    assert_eq!(over.body["requested"], 2);
    assert_eq!(over.body["inCart"], 4);
}

#[tokio::test]
async fn test_set_quantity_zero_then_remove_is_not_found() {
    let app = TestApp::new();
    let token = app.register("shopper").await;
    let fudge = app.create_sweet(&token, "Fudge", 2.5, 10).await;
    app.post("/api/cart", Some(&token), json!({ "sweetId": fudge, "quantity": 3 }))
        .await;
    let uri = format!("/api/cart/{fudge}");

    let updated = app.put(&uri, Some(&token), json!({ "quantity": 5 })).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["message"], "Cart updated successfully");
    assert_eq!(updated.data()["summary"]["totalItems"], 5);

    let no_quantity = app.put(&uri, Some(&token), json!({})).await;
    assert_eq!(no_quantity.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_quantity.error(), "Valid quantity is required.");

    let zeroed = app.put(&uri, Some(&token), json!({ "quantity": 0 })).await;
    assert_eq!(zeroed.status, StatusCode::OK);
    assert_eq!(zeroed.body["message"], "Item removed from cart");
    assert_eq!(zeroed.data()["summary"]["itemCount"], 0);

    let removed = app.delete(&uri, Some(&token)).await;
    assert_eq!(removed.status, StatusCode::NOT_FOUND);
    assert_eq!(removed.error(), "Item not found in cart.");
}

#[tokio::test]
async fn test_clear_cart() {
    let app = TestApp::new();
    let token = app.register("shopper").await;
    let fudge = app.create_sweet(&token, "Fudge", 2.5, 10).await;
    app.post("/api/cart", Some(&token), json!({ "sweetId": fudge }))
        .await;

    let cleared = app.delete("/api/cart", Some(&token)).await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.body["message"], "Cart cleared successfully");
    assert_eq!(cleared.data()["summary"]["itemCount"], 0);
}

#[tokio::test]
async fn test_checkout_receipt() {
    let app = TestApp::new();
    let token = app.register("shopper").await;
    let fudge = app.create_sweet(&token, "Fudge", 2.5, 10).await;
    let mint = app.create_sweet(&token, "Mint", 1.25, 4).await;
    app.post("/api/cart", Some(&token), json!({ "sweetId": fudge, "quantity": 2 }))
        .await;
    app.post("/api/cart", Some(&token), json!({ "sweetId": mint, "quantity": 4 }))
        .await;

    let response = app.post("/api/cart/checkout", Some(&token), json!({})).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["message"], "Purchase completed successfully");

    let receipt = response.data();
    assert!(receipt["orderId"].as_str().unwrap_or_default().starts_with("ORDER-"));
    assert_eq!(receipt["totalItems"], 6);
    assert_eq!(receipt["totalAmount"], json!(10.0));
    assert_eq!(receipt["purchasedItems"][1]["pricePerItem"], json!(1.25));
    assert_eq!(receipt["purchasedBy"]["username"], "shopper");

    assert_eq!(app.stock_of(fudge).await, 8);
    assert_eq!(app.stock_of(mint).await, 0);
    let cart = app.get("/api/cart", Some(&token)).await;
    assert_eq!(cart.data()["summary"]["itemCount"], 0);
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let app = TestApp::new();
    let token = app.register("shopper").await;

    let response = app.post("/api/cart/checkout", Some(&token), json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Cart is empty.");
}

#[tokio::test]
async fn test_checkout_short_line_is_all_or_nothing() {
    let app = TestApp::new();
    let shopper = app.register("shopper").await;
    let rival = app.register("rival").await;
    let fudge = app.create_sweet(&shopper, "Fudge", 2.5, 10).await;
    let mint = app.create_sweet(&shopper, "Mint", 1.25, 4).await;
    app.post("/api/cart", Some(&shopper), json!({ "sweetId": fudge, "quantity": 2 }))
        .await;
    app.post("/api/cart", Some(&shopper), json!({ "sweetId": mint, "quantity": 3 }))
        .await;

    let rival_buy = app
        .post(
            &format!("/api/sweets/{mint}/purchase"),
            Some(&rival),
            json!({ "quantity": 2 }),
        )
        .await;
    assert_eq!(rival_buy.status, StatusCode::OK);

    let response = app.post("/api/cart/checkout", Some(&shopper), json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Some items have insufficient stock");
    let details = response.body["details"].as_array().cloned().unwrap_or_default();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["sweetId"], mint);
    assert_eq!(details[0]["name"], "Mint");
    assert_eq!(details[0]["available"], 2);
    assert_eq!(details[0]["requested"], 3);

    assert_eq!(app.stock_of(fudge).await, 10);
    assert_eq!(app.stock_of(mint).await, 2);
    let cart = app.get("/api/cart", Some(&shopper)).await;
    assert_eq!(cart.data()["summary"]["itemCount"], 2);
}

#[tokio::test]
async fn test_price_snapshot_survives_catalog_change() {
    let app = TestApp::new();
    let token = app.register("shopper").await;
    let fudge = app.create_sweet(&token, "Fudge", 2.5, 10).await;
    app.post("/api/cart", Some(&token), json!({ "sweetId": fudge, "quantity": 2 }))
        .await;

    app.put(&format!("/api/sweets/{fudge}"), Some(&token), json!({ "price": 4.0 }))
        .await;

    let stale = app.get("/api/cart", Some(&token)).await;
    assert_eq!(stale.data()["summary"]["totalPrice"], json!(5.0));
    assert_eq!(stale.data()["cart"]["items"][0]["sweet"]["price"], json!(4.0));

    let touched = app
        .put(&format!("/api/cart/{fudge}"), Some(&token), json!({ "quantity": 2 }))
        .await;
    assert_eq!(touched.data()["summary"]["totalPrice"], json!(8.0));
}

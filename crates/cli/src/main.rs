//! Sweet Shop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! sweet-cli migrate
//!
//! # Create an admin account
//! sweet-cli admin create -u admin -e admin@example.com -p 'long-password'
//!
//! # List accounts with their roles
//! sweet-cli accounts list
//!
//! # Check connectivity and table counts
//! sweet-cli db check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin accounts
//! - `accounts list` - List accounts
//! - `db check` - Verify database connectivity

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sweet-cli")]
#[command(author, version, about = "Sweet Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },
    /// Database diagnostics
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin username (3-30 characters)
        #[arg(short, long)]
        username: String,

        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin password (6-128 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum AccountsAction {
    /// List all accounts, oldest first
    List,
}

#[derive(Subcommand)]
enum DbAction {
    /// Verify connectivity and report table counts
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::storefront(&pool).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
            } => {
                commands::admin::create(&pool, &username, &email, &password).await?;
            }
        },
        Commands::Accounts { action } => match action {
            AccountsAction::List => commands::accounts::list(&pool).await?,
        },
        Commands::Db { action } => match action {
            DbAction::Check => commands::db::check(&pool).await?,
        },
    }
    Ok(())
}

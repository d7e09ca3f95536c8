//! Portobello CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! portobello migrate
//!
//! # Seed demo data (a vendor, a shop, products, shipping, tax, a coupon)
//! portobello seed
//!
//! # Create a platform admin
//! portobello admin create -e ops@example.com -n "Ops"
//!
//! # Promote an existing account
//! portobello admin promote -e seller@example.com -r vendor
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database with demo marketplace data
//! - `admin create` - Create a platform admin account
//! - `admin promote` - Change an existing account's role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "portobello")]
#[command(author, version, about = "Portobello CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo marketplace data
    Seed,
    /// Manage accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new platform admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Password; a random one is generated and printed when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Change an existing account's role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer`, `vendor`, `admin`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create(&email, &name, password.as_deref()).await?;
            }
            AdminAction::Promote { email, role } => {
                commands::admin::promote(&email, &role).await?;
            }
        },
    }
    Ok(())
}

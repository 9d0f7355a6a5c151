//! Lasu Mart CLI - Database migrations and administration.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mart-cli migrate
//!
//! # Manage categories
//! mart-cli category add "Electronics" -i https://cdn.example.com/electronics.png
//! mart-cli category remove "Electronics"
//!
//! # Grant or revoke the admin role
//! mart-cli user promote -e admin@example.com
//! mart-cli user demote -e admin@example.com
//!
//! # Remove expired one-time codes
//! mart-cli otp purge
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use lasu_mart_core::Role;

mod commands;

#[derive(Parser)]
#[command(name = "mart-cli")]
#[command(author, version, about = "Lasu Mart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage product categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage user roles
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Maintain one-time codes
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// Add a category
    Add {
        /// Category title
        title: String,

        /// Image shown for the category
        #[arg(short, long)]
        image_url: String,
    },
    /// Remove a category
    Remove {
        /// Category title
        title: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Grant the admin role
    Promote {
        /// Email address of the user
        #[arg(short, long)]
        email: String,
    },
    /// Revoke the admin role
    Demote {
        /// Email address of the user
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum OtpAction {
    /// Delete expired codes
    Purge,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Category { action } => match action {
            CategoryAction::Add { title, image_url } => {
                commands::categories::add(&title, &image_url).await?;
            }
            CategoryAction::Remove { title } => commands::categories::remove(&title).await?,
        },
        Commands::User { action } => match action {
            UserAction::Promote { email } => commands::users::set_role(&email, Role::Admin).await?,
            UserAction::Demote { email } => commands::users::set_role(&email, Role::User).await?,
        },
        Commands::Otp { action } => match action {
            OtpAction::Purge => {
                commands::otp::purge().await?;
            }
        },
    }
    Ok(())
}

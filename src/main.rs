#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use countries_agent::auth::UserStore;
use countries_agent::config::Config;
use countries_agent::{db, gateway};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "countries-agent",
    about = "Chat with an agent about countries, with durable per-user history."
)]
struct Cli {
    /// Path to a config file (defaults to ./config.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Provision a user so it can log in.
    Seed {
        #[arg(long, default_value = "user1")]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let mut config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            gateway::run_gateway(config).await
        }
        Command::Seed { username } => {
            tracing::info!("seeding database...");
            let pool = db::connect(&config.database_url).await?;
            let users = UserStore::new(pool).await?;
            users.ensure_user(&username).await?;
            tracing::info!(%username, "seed complete");
            Ok(())
        }
    }
}

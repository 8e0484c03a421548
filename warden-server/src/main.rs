//! # Warden Server
//!
//! Account service over HTTP: registration, login, profile read/update,
//! password change, and role-gated endpoints.
//!
//! Accounts are stored in PostgreSQL when `DATABASE_URL` is set and in
//! process memory otherwise.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden_server::{
    infra::{
        config::{Config, ConfigLoad, ConfigLoader},
        startup,
    },
    routes,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "warden-server")]
#[command(about = "Account service with password login and role-gated access")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dotenv file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve(ServeArgs),
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Db(DbCommand::Migrate)) => run_db_migrate(&cli.serve).await,
        Some(Command::Serve(args)) => run_server(args).await,
        None => run_server(cli.serve).await,
    }
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }

    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    Ok(config)
}

async fn run_db_migrate(args: &ServeArgs) -> anyhow::Result<()> {
    let config = load_runtime_config(args)?;
    let pool = startup::connect_pool(&config.database).await?;
    warden_core::MIGRATOR
        .run(&pool)
        .await
        .context("failed to apply database migrations")?;
    info!("Database migrations applied");
    Ok(())
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_runtime_config(&args)?;
    let host = config.server.host.clone();
    let port = config.server.port;

    let state = startup::build_state(config).await?;
    let app = routes::create_router(state);

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!(
        address = %listener.local_addr().context("listener has no address")?,
        "Warden server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! compare-server - product comparison list service
//!
//! Serves the comparison API by default; `add-user` and `purge` are
//! maintenance commands run against the same database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use compare_common::config::{resolve_config_path, TomlConfig};
use compare_common::db::{init_database, purge_compare_data, users};
use compare_server::{build_router, load_config, AppState};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for compare-server
#[derive(Parser, Debug)]
#[command(name = "compare-server")]
#[command(about = "Product comparison list service")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to SQLite database (overrides config)
    #[arg(short, long, env = "PRODUCT_COMPARE_DATABASE")]
    database: Option<PathBuf>,

    /// HTTP server port (overrides config)
    #[arg(short, long, env = "PRODUCT_COMPARE_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create an account
    AddUser {
        username: String,
        password: String,
        #[arg(long, default_value = "customer")]
        role: String,
    },
    /// Delete every comparison list and the comparison settings
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = load_config(config_path.as_deref(), std::io::stdout)
        .context("Failed to load configuration")?;

    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let default_filter = format!(
        "compare_server={level},compare_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting compare-server v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }
    info!("Database: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, config).await,
        Command::AddUser {
            username,
            password,
            role,
        } => {
            let user = users::create_user(&pool, &username, &password, &role)
                .await
                .context("Failed to create user")?;
            info!("Created user {} ({}) with role {}", user.username, user.guid, user.role);
            Ok(())
        }
        Command::Purge => {
            let report = purge_compare_data(&pool)
                .await
                .context("Failed to purge comparison data")?;
            info!(
                "Purged {} comparison lists and {} settings",
                report.lists_removed, report.settings_removed
            );
            Ok(())
        }
    }
}

async fn serve(pool: sqlx::SqlitePool, config: TomlConfig) -> Result<()> {
    info!(
        "Comparison capacity {} items, guest compare {}",
        config.max_items,
        if config.allow_guest_compare { "enabled" } else { "disabled" }
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

mod status_cmd;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use liime_config::defaults::DEFAULT_PORT;
use liime_config::{config_dir, config_file_path, load_and_prepare, LiimeConfig};
use liime_core::{ChatId, InMemoryChatDirectory, UserId};
use liime_gateway::{build_router, serve, GatewayState, PathIdentityResolver, SessionSettings};
use liime_logging::init_logger;

#[derive(Parser)]
#[command(name = "liime")]
#[command(about = "Liime real-time messaging server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the presence and delivery server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Query a running server's health endpoint
    Status {
        /// Port of the running server (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = config_file_path(&config_dir());

    match cli.command {
        Commands::Serve { port } => {
            let (config, report) = load_and_prepare(&config_path)
                .await
                .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
            init_logger(config.log_dir(), config.log_level());
            for warning in &report.warnings {
                warn!(path = %warning.path, message = %warning.message, "Config warning");
            }
            run_server(config, port).await?;
        }
        Commands::Status { port } => {
            let port = match port {
                Some(port) => port,
                None => match load_and_prepare(&config_path).await {
                    Ok((config, _)) => config.port(),
                    Err(e) => {
                        eprintln!("Config unusable ({e:#}); assuming port {DEFAULT_PORT}");
                        DEFAULT_PORT
                    }
                },
            };
            status_cmd::run(port).await?;
        }
    }

    Ok(())
}

async fn run_server(config: LiimeConfig, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.port());
    let addr: SocketAddr = format!("{}:{}", config.host(), port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host(), port))?;

    info!(
        addr = %addr,
        debug = config.debug(),
        chats = config.chat_seeds().len(),
        "Starting Liime server"
    );

    let directory = Arc::new(InMemoryChatDirectory::new());
    for seed in config.chat_seeds() {
        directory
            .set_members(ChatId(seed.id), seed.members.iter().copied().map(UserId))
            .await;
    }

    let state = GatewayState::new(
        Arc::new(PathIdentityResolver),
        directory,
        SessionSettings::from(&config),
    );

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP and WebSocket listening");

    serve(listener, app, shutdown_signal()).await?;

    info!("Liime server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! CLI for HotView
//!
//! Subcommands:
//! - `serve`: run the todos sample over the WebSocket server

use std::sync::Arc;

use clap::Parser;
use hotview::config::load_config;
use hotview::samples::todos::{TodoStore, live_view};
use hotview::transport::start_websocket_server;
use hotview::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "hotview")]
enum Command {
    /// Start the WebSocket server
    Serve {
        /// Overrides `server.host` from the configuration
        #[arg(long)]
        host: Option<String>,
        /// Overrides `server.port` from the configuration
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    logging::init("info");

    match Command::parse() {
        Command::Serve { host, port } => {
            if let Err(e) = run_server(host, port).await {
                error!("Server failed: {e:#}");
            }
        }
    }
}

async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let view = Arc::new(live_view(config.view.clone(), Arc::new(TodoStore::new())));

    tokio::select! {
        res = start_websocket_server(&addr, view.clone()) => {
            if let Err(e) = res {
                error!("WebSocket server exited: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
    view.shutdown();

    Ok(())
}

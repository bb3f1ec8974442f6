use std::sync::Arc;
use tracing::{error, info, Level};

use lightsout_server::config::ServerConfig;
use lightsout_server::metrics::{self, Metrics};
use lightsout_server::net::transport::GameServer;
use lightsout_server::world;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Lights Out Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        anyhow::bail!("invalid configuration: {}", e);
    }
    info!(
        "Configuration loaded: {}:{}, max_connections={}",
        config.bind_address, config.port, config.max_connections
    );

    // Initialize metrics
    let metrics = Arc::new(Metrics::new());

    let metrics_port = config.metrics_port;
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    // Build the static level set; seeds are fresh per server start
    let levels = world::level::Level::default_set();
    for level in &levels {
        info!("Level {} '{}': {}x{}", level.level, level.name, level.width, level.height);
    }

    // Create the WebTransport server
    let server = GameServer::new(config.clone(), levels, metrics.clone()).await?;

    info!(
        "Server ready on https://{}:{}",
        config.bind_address, config.port
    );
    info!("Certificate hash: {}", server.cert_hash());

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    // Run server with graceful shutdown
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    info!("Server stopped");
    Ok(())
}

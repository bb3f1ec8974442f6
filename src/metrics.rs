//! Prometheus-compatible metrics endpoint
//!
//! Exposes server metrics in Prometheus format.
//! Default endpoint: http://localhost:9090/metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Metrics registry for the game server
#[derive(Debug)]
pub struct Metrics {
    // Session counts
    pub connections_active: AtomicU64,
    pub players_registered: AtomicU64,

    // Message accounting
    pub messages_received: AtomicU64,
    pub messages_sent: AtomicU64,
    pub broadcasts: AtomicU64,

    // Protocol health
    pub invalid_payloads: AtomicU64,
    pub moves_clamped: AtomicU64,
    pub voice_frames_relayed: AtomicU64,

    // Server uptime
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            players_registered: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            invalid_payloads: AtomicU64::new(0),
            moves_clamped: AtomicU64::new(0),
            voice_frames_relayed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("lightsout_connections_active", "Active WebTransport connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("lightsout_players_registered", "Players in the registry", "gauge",
            self.players_registered.load(Ordering::Relaxed));
        metric!("lightsout_messages_received_total", "Total messages received", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("lightsout_messages_sent_total", "Total messages sent", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("lightsout_broadcasts_total", "Total broadcast fan-outs", "counter",
            self.broadcasts.load(Ordering::Relaxed));
        metric!("lightsout_invalid_payloads_total", "Messages dropped as malformed", "counter",
            self.invalid_payloads.load(Ordering::Relaxed));
        metric!("lightsout_moves_clamped_total", "Moves clamped to level bounds", "counter",
            self.moves_clamped.load(Ordering::Relaxed));
        metric!("lightsout_voice_frames_total", "Voice frames relayed", "counter",
            self.voice_frames_relayed.load(Ordering::Relaxed));
        metric!("lightsout_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    let response = if request.starts_with("GET /metrics") {
                        let body = metrics.to_prometheus();
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
                        let body = "OK";
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

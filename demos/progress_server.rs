//! Progress broadcast example
//!
//! Run with: cargo run --example progress_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example progress_server                  # binds to 127.0.0.1:5974
//!   cargo run --example progress_server 0.0.0.0:8080     # binds to 0.0.0.0:8080
//!
//! ## Subscribing
//!
//! With curl:
//!   curl -N http://127.0.0.1:5974/sse
//!
//! From a browser overlay:
//!   new EventSource("http://127.0.0.1:5974/sse").onmessage = e => console.log(e.data)
//!
//! A pretend tracker pushes a JSON progress update every two seconds. Clients
//! that connect in between immediately receive the latest update.

use std::net::SocketAddr;
use std::time::Duration;

use progress_sse::{ServerConfig, SseServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ServerConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        let addr: SocketAddr = arg.parse()?;
        config = config.bind(addr);
    }

    let server = SseServer::new(config);
    let addr = server.start().await?;
    println!("Streaming progress on http://{}/sse (Ctrl+C to stop)", addr);

    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    let mut completed = 0u32;
    let total = 80u32;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                completed = (completed + 1) % (total + 1);
                let payload = format!(
                    r#"{{"completed":{},"total":{},"percent":{:.1}}}"#,
                    completed,
                    total,
                    completed as f64 * 100.0 / total as f64
                );
                server.push(payload).await;

                let stats = server.stats();
                println!(
                    "pushed {} -> {} subscribers (evicted so far: {})",
                    completed,
                    server.subscriber_count().await,
                    stats.subscribers_evicted
                );
            }
        }
    }

    server.shutdown().await;
    Ok(())
}

use clap::Parser;
use livemap_server::{Server, ServerConfig};
use log::{error, info};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Marker snapshot file
    #[arg(short, long, default_value = livemap_shared::DEFAULT_SNAPSHOT_PATH)]
    snapshot: PathBuf,

    /// Seconds without activity before a session is evicted
    #[arg(long, default_value = "10")]
    session_timeout: u64,

    /// Milliseconds between idle-session sweeps
    #[arg(long, default_value = "1000")]
    reap_interval: u64,

    /// Seconds between snapshot writes
    #[arg(long, default_value = "5")]
    snapshot_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let bind_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = ServerConfig::new(bind_addr)
        .with_snapshot_path(args.snapshot)
        .with_session_timeout(Duration::from_secs(args.session_timeout))
        .with_reap_interval(Duration::from_millis(args.reap_interval))
        .with_snapshot_interval(Duration::from_secs(args.snapshot_interval));

    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return Err(e.into());
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

use clap::Parser;
use livemap_client::{Client, MapClient};
use livemap_shared::Position;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server base URL
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Display name shown to other users
    #[arg(short = 'n', long, default_value = "anonymous")]
    name: String,

    /// Milliseconds between polls
    #[arg(long, default_value = "1000")]
    poll_interval: u64,

    /// Latitude to report (requires --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude to report (requires --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Place a marker at the reported position after logging in
    #[arg(long, requires = "lat")]
    mark: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let api = MapClient::new(&args.server);
    let mut client = Client::new(api, args.name, Duration::from_millis(args.poll_interval));

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        info!("Reporting position ({}, {})", lat, lon);
        client = client.with_position(Position::new(lat, lon));
        if args.mark {
            client = client.with_marker();
        }
    }

    tokio::select! {
        _ = client.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

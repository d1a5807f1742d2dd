use clap::Parser;
use client::bot::RandomPilot;
use client::config::ClientConfig;
use client::game::ClientGame;
use client::network::Client;
use log::info;
use shared::protocol::WireFormat;
use std::time::Duration;

/// Headless arcade client that flies a ship with random input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8081")]
    server: String,

    /// Name to join with
    #[arg(short = 'n', long, default_value = "bot")]
    name: String,

    /// Watch instead of playing
    #[arg(long)]
    spectate: bool,

    /// Milliseconds per local input tick
    #[arg(short = 't', long, default_value = "150")]
    tick_ms: u64,

    /// Seed for the random pilot
    #[arg(long)]
    seed: Option<u64>,

    /// Send JSON text frames instead of binary
    #[arg(long)]
    text: bool,
}

impl Args {
    fn into_config(self) -> (ClientConfig, Option<u64>) {
        let tick_interval = Duration::from_millis(self.tick_ms.max(1));
        let config = ClientConfig {
            server_url: self.server,
            name: self.name,
            spectate: self.spectate,
            tick_interval,
            interpolation_delay: tick_interval,
            wire_format: if self.text {
                WireFormat::Text
            } else {
                WireFormat::Binary
            },
            ..ClientConfig::default()
        };
        (config, self.seed)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let (config, seed) = args.into_config();

    info!("Starting client...");
    info!("Connecting to: {}", config.server_url);

    let mut game = ClientGame::new(config);
    game.on_died(|| info!("Ship destroyed, watching until disconnected"));
    game.on_disconnect(|| info!("Session ended"));

    let pilot = RandomPilot::new(seed.unwrap_or_else(rand::random));
    let mut client = Client::connect(game, Some(pilot)).await?;

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

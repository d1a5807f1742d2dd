use clap::Parser;
use log::info;
use server::config::GameConfig;
use server::network::Server;
use shared::protocol::WireFormat;
use std::time::Duration;

/// Authoritative arcade game server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8081")]
    port: u16,
    /// Milliseconds per tick
    #[clap(short, long, default_value = "150")]
    tick_ms: u64,
    /// Seconds without input before a user is dropped
    #[clap(long, default_value = "120")]
    input_timeout: u64,
    /// Seconds without a ping before a connection is dropped
    #[clap(long, default_value = "30")]
    ping_timeout: u64,
    /// Seconds a spectator may watch
    #[clap(long, default_value = "30")]
    spectator_duration: u64,
    #[clap(long, default_value = "1950")]
    screen_width: f32,
    #[clap(long, default_value = "900")]
    screen_height: f32,
    #[clap(long, default_value = "200")]
    max_users: usize,
    #[clap(long, default_value = "200")]
    max_spectators: usize,
    /// Send JSON text frames until a client's first frame says otherwise
    #[clap(long)]
    text: bool,
}

impl Args {
    fn into_config(self) -> GameConfig {
        let mut config = GameConfig::default().with_screen(self.screen_width, self.screen_height);
        config.tick_interval = Duration::from_millis(self.tick_ms.max(1));
        config.input_timeout = Duration::from_secs(self.input_timeout);
        config.ping_timeout = Duration::from_secs(self.ping_timeout);
        config.spectator_duration = Duration::from_secs(self.spectator_duration);
        config.max_users = self.max_users;
        config.max_spectators = self.max_spectators;
        if self.text {
            config.default_wire_format = WireFormat::Text;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let config = args.into_config();
    info!(
        "Starting server on {} ({}ms ticks, screen {}x{})",
        address,
        config.tick_interval.as_millis(),
        config.screen_width,
        config.screen_height
    );

    let mut server = Server::bind(&address, config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

//! Client settings, fixed for the lifetime of a session.

use shared::protocol::WireFormat;
use shared::{PING_INTERVAL_MS, SCREEN_HEIGHT, SERVER_TICK_MS, SERVER_VERSION};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL, e.g. `ws://127.0.0.1:8081`
    pub server_url: String,
    pub name: String,
    /// Watch instead of joining.
    pub spectate: bool,
    /// How often local input is sampled, predicted and sent.
    pub tick_interval: Duration,
    /// Time taken to glide a remote entity from its previous snapshot
    /// position to its latest one.
    pub interpolation_delay: Duration,
    pub ping_interval: Duration,
    pub wire_format: WireFormat,
    /// The only server version this client can talk to.
    pub server_version: u8,
    /// Must match the server's screen height for prediction to agree.
    pub world_height: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8081".to_string(),
            name: "pilot".to_string(),
            spectate: false,
            tick_interval: Duration::from_millis(SERVER_TICK_MS),
            interpolation_delay: Duration::from_millis(SERVER_TICK_MS),
            ping_interval: Duration::from_millis(PING_INTERVAL_MS),
            wire_format: WireFormat::Binary,
            server_version: SERVER_VERSION,
            world_height: SCREEN_HEIGHT,
        }
    }
}

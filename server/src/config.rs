//! Immutable server configuration, built once at startup.

use shared::protocol::WireFormat;
use shared::{MAX_NAME_LENGTH, SCREEN_HEIGHT, SCREEN_WIDTH, SERVER_TICK_MS, SERVER_VERSION};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub tick_interval: Duration,
    pub server_version: u8,
    pub screen_width: f32,
    pub screen_height: f32,
    /// Width of the band around a viewer whose entities are sent to it.
    pub screen_range: f32,
    /// Users are dropped after this long without movement input.
    pub input_timeout: Duration,
    pub ping_timeout: Duration,
    pub spectator_duration: Duration,
    /// Wall-clock budget for draining inbound messages each tick.
    pub input_drain_budget: Duration,
    pub leaderboard_every_ticks: u64,
    pub spectator_camera_every_ticks: u64,
    pub max_name_length: usize,
    pub max_users: usize,
    pub max_spectators: usize,
    /// Players further apart than this belong to different groupings.
    pub cluster_gap: f32,
    pub enemies_per_player: f32,
    pub max_players_counted_per_grouping: usize,
    pub meteor_wave_every_ticks: u64,
    pub meteors_per_grouping: usize,
    pub player_start_y: f32,
    /// Outbound wire format until a client's first frame says otherwise.
    pub default_wire_format: WireFormat,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(SERVER_TICK_MS),
            server_version: SERVER_VERSION,
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            screen_range: SCREEN_WIDTH * 1.4,
            input_timeout: Duration::from_secs(120),
            ping_timeout: Duration::from_secs(30),
            spectator_duration: Duration::from_secs(30),
            input_drain_budget: Duration::from_millis(100),
            leaderboard_every_ticks: 10,
            spectator_camera_every_ticks: 15,
            max_name_length: MAX_NAME_LENGTH,
            max_users: 200,
            max_spectators: 200,
            cluster_gap: SCREEN_WIDTH,
            enemies_per_player: 1.5,
            max_players_counted_per_grouping: 4,
            meteor_wave_every_ticks: 50,
            meteors_per_grouping: 10,
            player_start_y: SCREEN_HEIGHT * 0.8,
            default_wire_format: WireFormat::Binary,
        }
    }
}

impl GameConfig {
    /// Tick length in whole milliseconds, used for time-based counters.
    pub fn tick_ms(&self) -> u32 {
        self.tick_interval.as_millis().min(u32::MAX as u128) as u32
    }

    /// Applies a new screen size and the values derived from it.
    pub fn with_screen(mut self, width: f32, height: f32) -> Self {
        self.screen_width = width;
        self.screen_height = height;
        self.screen_range = width * 1.4;
        self.cluster_gap = width;
        self.player_start_y = height * 0.8;
        self
    }
}

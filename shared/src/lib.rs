//! Types and logic shared by the arcade server and its clients.
//!
//! Everything that both sides must agree on lives here: the binary schema
//! codec and the message descriptors built on it, the entity models carried
//! in world snapshots, the player movement rules (run by the server's
//! simulation and replayed by client prediction), weapon tables and the
//! order-preserving registry used to own entities.

pub mod clock;
pub mod ids;
pub mod models;
pub mod physics;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod weapons;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::IdGenerator;
pub use models::EntityModel;
pub use protocol::{ClientToServerMessage, InputKeys, PlayerInput, ServerToClientMessage};
pub use registry::{Keyed, Registry};
pub use weapons::PlayerWeapon;

/// Protocol version embedded in `joined` and `spectating`.
pub const SERVER_VERSION: u8 = 9;

pub const SCREEN_WIDTH: f32 = 1950.0;
pub const SCREEN_HEIGHT: f32 = 900.0;

/// Nominal duration of one server tick in milliseconds.
pub const SERVER_TICK_MS: u64 = 150;

/// How often a client pings the server.
pub const PING_INTERVAL_MS: u64 = 3_000;

pub const PLAYER_STARTING_HEALTH: u8 = 25;

/// Longest accepted player name, in characters.
pub const MAX_NAME_LENGTH: usize = 10;

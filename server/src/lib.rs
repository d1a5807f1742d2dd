//! # Arcade Game Server Library
//!
//! The authoritative server for the multiplayer arcade shooter. It owns the
//! canonical world, applies client input, simulates every entity at a fixed
//! tick rate and sends each connection the part of the world it can see.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Players, enemies, meteors, shots, drops, shields and explosions all live
//! in one order-preserving registry and are advanced once per tick. Clients
//! predict their own ship with the same movement rules and conform to the
//! server's snapshots.
//!
//! ### Connection Lifecycle
//! A connection starts unauthenticated and becomes a user (with a player
//! entity) or a spectator (watching through a shared camera). Closes,
//! corrupted frames and timeouts are all handled by one sweep at the end of
//! the tick.
//!
//! ### Interest Management
//! Each tick an interval tree over entity x positions answers "what is near
//! this viewer", so a user only receives entities within screen range of
//! their ship.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Tick
//! All game state is owned by the main loop task. Network tasks only move
//! bytes and talk to it over channels, so the tick itself needs no locks.
//! Inbound messages are applied at the start of the next tick under a time
//! budget; outbound messages are batched into one frame per connection.
//!
//! ### WebSocket Transport
//! Frames are binary (schema codec) by default. JSON text frames are also
//! accepted, and a connection is answered in the format it last used.
//!
//! ## Module Organization
//!
//! - `config`: immutable [`config::GameConfig`]
//! - `connection`: per-connection state machine and timeouts
//! - `entity`: entity variants and their capability traits
//! - `collision`: broad phase and hit resolution
//! - `spatial`, `clusterer`: interval tree and x-axis groupings
//! - `leaderboard`: per-player stats and ranking
//! - `game`: [`game::ServerGame`], the tick pipeline
//! - `network`: WebSocket transport and tick scheduler
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind("127.0.0.1:8080", GameConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod clusterer;
pub mod collision;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod game;
pub mod leaderboard;
pub mod network;
pub mod spatial;

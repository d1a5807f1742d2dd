//! # Arcade Game Client Library
//!
//! Client side of the multiplayer arcade shooter: input capture, prediction
//! of the local ship, reconciliation with the server, interpolation of
//! everything else and the WebSocket transport. Rendering is left to the
//! embedding application; [`game::ClientGame::render_list`] hands it world
//! positions ready to draw.
//!
//! ## Architecture Overview
//!
//! ### Client-Side Prediction
//! Each local tick the held keys become a sequenced input. The input is
//! applied to the local ship straight away, using the same movement code as
//! the server, and kept until the server acknowledges it.
//!
//! ### Server Reconciliation
//! Every snapshot of our own ship carries the last input sequence number the
//! server applied. Acknowledged inputs are dropped and the rest are replayed
//! on top of the server's position. Snapshots older than one already applied
//! are ignored.
//!
//! ### Interpolation
//! Other entities are never predicted. They glide from their previous
//! snapshot position to the latest one, and shields and explosions attached
//! to an owner are drawn relative to that owner.
//!
//! ## Module Organization
//!
//! - `config`: [`config::ClientConfig`]
//! - `input`: held keys and input sequencing
//! - `prediction`: pending input buffer and reconciliation
//! - `game`: session state, snapshots and lifecycle callbacks
//! - `network`: WebSocket connection and the headless client loop
//! - `bot`: a random pilot for soak testing
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::config::ClientConfig;
//! use client::game::ClientGame;
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut game = ClientGame::new(ClientConfig::default());
//!     game.on_died(|| println!("destroyed"));
//!     let mut client = Client::connect(game, None).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod prediction;

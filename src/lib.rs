//! Two-Player Nim Game Server Library
//!
//! A TCP game server: clients register a name, are paired by a
//! matchmaker and play Nim over a small length-prefixed text protocol.
//!
//! # Features
//! - `0|LL|TYPE|field|...|` frame codec
//! - Name registration with uniqueness checks
//! - Arrival-order matchmaking with a bounded waiting list
//! - Nim rules on a five-pile board (1 3 5 7 9)
//! - Per-turn watching of both players, with forfeit on disconnect
//!
//! # Architecture
//! - One `handler` task per accepted connection until it is matched
//! - One `Session` task per match, owning both connections
//! - `Matchmaker` is the only shared state, behind a single mutex
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use nim_server::{serve, Matchmaker, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(&config.bind_address).await.unwrap();
//!     let matchmaker = Arc::new(Matchmaker::from_config(&config));
//!
//!     serve(listener, matchmaker, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod handler;
pub mod matchmaker;
pub mod message;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use connection::Connection;
pub use error::{AppError, FrameError, MoveError, RegisterError};
pub use game::Game;
pub use handler::handle_connection;
pub use matchmaker::Matchmaker;
pub use message::{ClientMessage, ErrorCode, Frame, MessageType, ServerMessage};
pub use server::serve;
pub use session::Session;
pub use types::{ClientId, PlayerNumber};

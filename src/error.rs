//! Error types for the game server
//!
//! Defines server-level errors, frame receive errors, registration
//! errors and rule violations. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// These end the process or the task that hits them.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Bind address given on the command line is unusable
    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

/// Errors from receiving a frame on a connection
#[derive(Debug, Error)]
pub enum FrameError {
    /// Peer closed the stream
    #[error("Connection closed")]
    Closed,

    /// Transport read/write failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Envelope, length, field or type violation
    #[error("Malformed frame: {0}")]
    Malformed(&'static str),
}

/// Waiting-list admission errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    /// Name is held by a queued or playing connection
    #[error("Name '{0}' is already playing")]
    NameTaken(String),

    /// Waiting list is at capacity
    #[error("Waiting list is full")]
    QueueFull,
}

/// Rejected moves
///
/// A rejected move leaves the game state unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// Move attempted by the player who does not hold the turn
    #[error("Not this player's turn")]
    Impatient,

    /// Pile index outside the board
    #[error("Invalid pile index: {0}")]
    PileIndex(i64),

    /// Quantity not positive or larger than the pile
    #[error("Invalid quantity: {0}")]
    Quantity(i64),
}

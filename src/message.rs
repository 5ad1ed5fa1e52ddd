//! Message protocol definitions
//!
//! Pipe-delimited text protocol. Every frame carries a four-letter type
//! tag followed by zero or more fields; see [`crate::codec`] for framing.

use crate::codec;
use crate::error::{MoveError, RegisterError};
use crate::types::PlayerNumber;

/// Fail text sent when the waiting list is at capacity
pub const SERVER_FULL: &str = "Server Full";

/// Frame type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Open,
    Wait,
    Name,
    Play,
    Move,
    Fail,
    Over,
}

impl MessageType {
    /// Wire tag for this type
    pub fn tag(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Wait => "WAIT",
            Self::Name => "NAME",
            Self::Play => "PLAY",
            Self::Move => "MOVE",
            Self::Fail => "FAIL",
            Self::Over => "OVER",
        }
    }

    /// Look up a tag in the set of types accepted from a peer
    ///
    /// `WAIT` is server-only and is not accepted inbound.
    pub fn from_inbound_tag(tag: &str) -> Option<Self> {
        match tag {
            "OPEN" => Some(Self::Open),
            "MOVE" => Some(Self::Move),
            "FAIL" => Some(Self::Fail),
            "NAME" => Some(Self::Name),
            "PLAY" => Some(Self::Play),
            "OVER" => Some(Self::Over),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded frame: type plus its fields in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageType,
    pub fields: Vec<String>,
}

/// Client → Server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Register with a display name
    Open { name: String },
    /// Remove `quantity` stones from pile `pile`
    Move { pile: i64, quantity: i64 },
}

impl ClientMessage {
    /// Interpret a decoded frame as a client message
    ///
    /// Any frame of another type, or with the wrong field shape, is an
    /// invalid message (code 10).
    pub fn from_frame(frame: &Frame) -> Result<Self, ErrorCode> {
        match (frame.kind, frame.fields.as_slice()) {
            (MessageType::Open, [name]) if !name.is_empty() => {
                Ok(Self::Open { name: name.clone() })
            }
            (MessageType::Move, [pile, quantity]) => {
                let pile = pile.trim().parse().map_err(|_| ErrorCode::Invalid)?;
                let quantity = quantity.trim().parse().map_err(|_| ErrorCode::Invalid)?;
                Ok(Self::Move { pile, quantity })
            }
            _ => Err(ErrorCode::Invalid),
        }
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Queued, awaiting an opponent
    Wait,
    /// Assigned seat and the opponent's name
    Name {
        player: PlayerNumber,
        opponent: String,
    },
    /// Whose turn it is and the current board
    Play { turn: PlayerNumber, board: String },
    /// Rejection of the previous input
    Fail(String),
    /// Match conclusion
    Over {
        winner: PlayerNumber,
        board: String,
        reason: String,
    },
}

impl ServerMessage {
    pub fn kind(&self) -> MessageType {
        match self {
            Self::Wait => MessageType::Wait,
            Self::Name { .. } => MessageType::Name,
            Self::Play { .. } => MessageType::Play,
            Self::Fail(_) => MessageType::Fail,
            Self::Over { .. } => MessageType::Over,
        }
    }

    /// Field values in wire order
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::Wait => Vec::new(),
            Self::Name { player, opponent } => vec![player.to_string(), opponent.clone()],
            Self::Play { turn, board } => vec![turn.to_string(), board.clone()],
            Self::Fail(reason) => vec![reason.clone()],
            Self::Over {
                winner,
                board,
                reason,
            } => vec![winner.to_string(), board.clone(), reason.clone()],
        }
    }

    /// Encode as a complete wire frame
    pub fn encode(&self) -> String {
        codec::encode(self.kind(), &self.fields())
    }
}

/// Numbered rejection codes carried in FAIL frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid or malformed message
    Invalid,
    /// Name longer than the limit
    LongName,
    /// Name already in use
    AlreadyPlaying,
    /// OPEN on an already opened connection
    AlreadyOpen,
    /// MOVE before the match has started
    NotPlaying,
    /// MOVE out of turn
    Impatient,
    /// Pile index out of range
    PileIndex,
    /// Quantity out of range
    Quantity,
}

impl ErrorCode {
    pub fn code(self) -> u8 {
        match self {
            Self::Invalid => 10,
            Self::LongName => 21,
            Self::AlreadyPlaying => 22,
            Self::AlreadyOpen => 23,
            Self::NotPlaying => 24,
            Self::Impatient => 31,
            Self::PileIndex => 32,
            Self::Quantity => 33,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::LongName => "Long Name",
            Self::AlreadyPlaying => "Already Playing",
            Self::AlreadyOpen => "Already Open",
            Self::NotPlaying => "Not Playing",
            Self::Impatient => "Impatient",
            Self::PileIndex => "Pile Index",
            Self::Quantity => "Quantity",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.description())
    }
}

impl From<MoveError> for ErrorCode {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::Impatient => ErrorCode::Impatient,
            MoveError::PileIndex(_) => ErrorCode::PileIndex,
            MoveError::Quantity(_) => ErrorCode::Quantity,
        }
    }
}

/// Convert an error code into the FAIL frame that reports it
impl From<ErrorCode> for ServerMessage {
    fn from(code: ErrorCode) -> Self {
        ServerMessage::Fail(code.to_string())
    }
}

impl From<RegisterError> for ServerMessage {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::NameTaken(_) => ErrorCode::AlreadyPlaying.into(),
            RegisterError::QueueFull => ServerMessage::Fail(SERVER_FULL.to_string()),
        }
    }
}

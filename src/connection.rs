//! Connection (player) definition
//!
//! Owns one client's socket, identity and lifecycle phase. All reads and
//! writes go through the frame codec.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::codec;
use crate::error::FrameError;
use crate::message::{ClientMessage, ErrorCode, Frame, ServerMessage};
use crate::types::ClientId;

/// Bytes taken by one read; one read is one logical frame
pub const READ_BUFFER_SIZE: usize = 256;

/// Longest accepted display name, in characters
pub const MAX_NAME_LEN: usize = 72;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepted, OPEN not yet received
    Connected,
    /// In the waiting list, not claimed by a match
    Queued,
    /// Claimed by a match that has not announced yet
    Matched,
    /// Match announced; moves are expected
    Playing,
    Closed,
}

/// A connected player
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ClientId,
    peer: String,
    stream: TcpStream,
    name: Option<String>,
    phase: Phase,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            id: ClientId::new(),
            peer,
            stream,
            name: None,
            phase: Phase::Connected,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Registered name, or "Unknown" before OPEN
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// OPEN handshake completed
    #[cfg(test)]
    pub fn has_opened(&self) -> bool {
        self.name.is_some()
    }

    /// Bound to a match (claimed or playing)
    #[cfg(test)]
    pub fn in_game(&self) -> bool {
        matches!(self.phase, Phase::Matched | Phase::Playing)
    }

    /// Match has been announced to this player
    pub fn began(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn set_phase(&mut self, phase: Phase) {
        debug!("Connection {} phase {:?} -> {:?}", self.id, self.phase, phase);
        self.phase = phase;
    }

    /// Wait for the OPEN frame and store the requested name
    ///
    /// Framing failures and anything other than `OPEN|name|` are answered
    /// with FAIL 10 before the error is returned.
    pub async fn open(&mut self) -> Result<String, FrameError> {
        let frame = self.receive_frame().await?;

        match ClientMessage::from_frame(&frame) {
            Ok(ClientMessage::Open { name }) => {
                self.name = Some(name.clone());
                Ok(name)
            }
            _ => {
                let _ = self.send(&ErrorCode::Invalid.into()).await;
                Err(FrameError::Malformed("expected OPEN"))
            }
        }
    }

    /// Encode and write one message
    pub async fn send(&mut self, msg: &ServerMessage) -> Result<(), FrameError> {
        let encoded = msg.encode();
        debug!("-> {} {}", self.id, encoded);

        if let Err(e) = self.stream.write_all(encoded.as_bytes()).await {
            warn!("Send to {} failed: {}", self.id, e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read one raw chunk from the socket
    ///
    /// Performs a single read, so dropping the future before it completes
    /// loses no data.
    pub async fn read_chunk(&mut self) -> Result<Vec<u8>, FrameError> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Err(FrameError::Closed);
        }
        buf.truncate(n);
        Ok(buf)
    }

    /// Decode a raw chunk, answering FAIL 10 if it is not a valid frame
    pub async fn accept_frame(&mut self, raw: &[u8]) -> Result<Frame, FrameError> {
        match codec::decode(raw) {
            Ok(frame) => {
                debug!("<- {} {:?}", self.id, frame);
                Ok(frame)
            }
            Err(e) => {
                warn!("Rejected frame from {}: {}", self.id, e);
                let _ = self.send(&ErrorCode::Invalid.into()).await;
                Err(e)
            }
        }
    }

    /// Block for one frame
    pub async fn receive_frame(&mut self) -> Result<Frame, FrameError> {
        let raw = self.read_chunk().await?;
        self.accept_frame(&raw).await
    }

    /// Shut the socket down and release it
    pub async fn close(mut self) {
        self.set_phase(Phase::Closed);
        let _ = self.stream.shutdown().await;
        debug!("Connection {} ({}) closed", self.id, self.peer);
    }
}

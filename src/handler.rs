//! TCP connection handler
//!
//! Handles one accepted client up to the point a match takes it over:
//! OPEN handshake, name checks, waiting-list registration, then a queue
//! wait that watches the socket until a session claims the connection.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::connection::{Connection, Phase, MAX_NAME_LEN};
use crate::error::{AppError, FrameError};
use crate::matchmaker::{Handoff, Matchmaker};
use crate::message::{ErrorCode, MessageType, ServerMessage};

/// Handle a new TCP connection
///
/// Returns once the connection is closed or has been handed to a session.
pub async fn handle_connection(
    stream: TcpStream,
    matchmaker: Arc<Matchmaker>,
) -> Result<(), AppError> {
    let mut conn = Connection::new(stream);
    debug!("Client {} connected from {}", conn.id, conn.peer());

    let name = match conn.open().await {
        Ok(name) => name,
        Err(e) => {
            debug!("Client {} failed to open: {}", conn.id, e);
            conn.close().await;
            return Ok(());
        }
    };

    if name.chars().count() > MAX_NAME_LEN {
        info!("Client {} rejected: name too long", conn.id);
        let _ = conn.send(&ErrorCode::LongName.into()).await;
        conn.close().await;
        return Ok(());
    }

    let (claim_tx, claim_rx) = oneshot::channel();
    if let Err(e) = matchmaker.register(conn.id, &name, claim_tx) {
        info!("Client {} rejected: {}", conn.id, e);
        let _ = conn.send(&e.into()).await;
        conn.close().await;
        return Ok(());
    }

    conn.set_phase(Phase::Queued);
    let _ = conn.send(&ServerMessage::Wait).await;

    matchmaker.try_pair();
    await_match(conn, claim_rx, &matchmaker).await;
    Ok(())
}

/// Sit in the waiting list until a session claims the connection
///
/// Inbound frames are still answered while queued. A disconnect, a second
/// OPEN or a premature MOVE removes the entry and closes the connection.
async fn await_match(
    mut conn: Connection,
    mut claim: oneshot::Receiver<Handoff>,
    matchmaker: &Arc<Matchmaker>,
) {
    let mut tick = tokio::time::interval(matchmaker.poll_interval());
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            handoff = &mut claim => {
                match handoff {
                    Ok(handoff) => {
                        debug!("Handing '{}' to its session", conn.display_name());
                        conn.set_phase(Phase::Matched);
                        if let Err(conn) = handoff.send(conn) {
                            conn.close().await;
                        }
                    }
                    Err(_) => {
                        warn!("Claim channel for '{}' dropped", conn.display_name());
                        matchmaker.unregister(conn.id);
                        conn.close().await;
                    }
                }
                return;
            }
            raw = conn.read_chunk() => {
                if !handle_queued_input(&mut conn, raw).await {
                    matchmaker.unregister(conn.id);
                    conn.close().await;
                    return;
                }
            }
            _ = tick.tick() => {
                if matchmaker.count_eligible() >= 2 {
                    matchmaker.try_pair();
                }
            }
        }
    }
}

/// Answer one input received while queued; false means drop the connection
async fn handle_queued_input(conn: &mut Connection, raw: Result<Vec<u8>, FrameError>) -> bool {
    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => {
            info!("'{}' left the queue: {}", conn.display_name(), e);
            return false;
        }
    };

    let Ok(frame) = conn.accept_frame(&raw).await else {
        return true;
    };

    match frame.kind {
        MessageType::Open => {
            let _ = conn.send(&ErrorCode::AlreadyOpen.into()).await;
            false
        }
        MessageType::Move if !conn.began() => {
            let _ = conn.send(&ErrorCode::NotPlaying.into()).await;
            false
        }
        _ => {
            let _ = conn.send(&ErrorCode::Invalid.into()).await;
            true
        }
    }
}

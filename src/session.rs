//! Match session
//!
//! Drives one paired match from announcement to game over:
//! NAME to both players, then per turn a PLAY broadcast followed by a
//! wait on both sockets at once, and finally OVER to whoever is still
//! connected.
//!
//! While waiting for the current player's move the opponent's socket is
//! watched too, so an impatient move, a duplicate OPEN or a disconnect
//! from either side is noticed without waiting on a stalled player. The
//! opponent's socket is checked first when both are ready.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::connection::{Connection, Phase};
use crate::error::FrameError;
use crate::game::Game;
use crate::matchmaker::{Matchmaker, Pairing};
use crate::message::{ClientMessage, ErrorCode, MessageType, ServerMessage};
use crate::types::PlayerNumber;

/// Reason field of OVER when a match ends early
pub const FORFEIT_REASON: &str = "Forfeit";

/// How a single turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnOutcome {
    /// The current player's move was accepted
    Moved,
    /// The match cannot continue
    Forfeit,
}

/// First socket to become ready during a turn
enum Event {
    Opponent(Result<Vec<u8>, FrameError>),
    Current(Result<Vec<u8>, FrameError>),
}

/// One running match
///
/// Owns the game state and both connections; nothing else touches them
/// while the session runs. A `None` seat is a side that has disconnected
/// or been torn down.
pub struct Session {
    game: Game,
    seats: [Option<Connection>; 2],
    names: [String; 2],
    matchmaker: Arc<Matchmaker>,
}

impl Session {
    pub fn new(
        game: Game,
        seats: [Option<Connection>; 2],
        names: [String; 2],
        matchmaker: Arc<Matchmaker>,
    ) -> Self {
        Self {
            game,
            seats,
            names,
            matchmaker,
        }
    }

    /// Collect both handed-off connections and run the match
    ///
    /// A side whose handler never delivers is treated as disconnected.
    pub async fn start(pairing: Pairing, matchmaker: Arc<Matchmaker>) {
        let Pairing { first, second } = pairing;
        let (one, two) = tokio::join!(first.connection, second.connection);

        if one.is_err() {
            warn!("'{}' left before the match started", first.name);
        }
        if two.is_err() {
            warn!("'{}' left before the match started", second.name);
        }

        let game = Game::new(first.id, second.id);
        Session::new(
            game,
            [one.ok(), two.ok()],
            [first.name, second.name],
            matchmaker,
        )
        .run()
        .await;
    }

    /// Play the match to completion, then release everything
    pub async fn run(mut self) {
        info!("Match started: '{}' vs '{}'", self.names[0], self.names[1]);
        self.announce().await;

        // A side that never arrived forfeits before the first PLAY.
        let mut forfeit = self.seats.iter().any(Option::is_none);
        while !forfeit && !self.game.is_over() {
            self.broadcast_play().await;

            match self.await_move().await {
                TurnOutcome::Moved => self.game.advance_turn(),
                TurnOutcome::Forfeit => {
                    forfeit = true;
                    break;
                }
            }
        }

        self.conclude(forfeit).await;
        self.close().await;
    }

    async fn announce(&mut self) {
        for player in PlayerNumber::both() {
            let opponent = self.names[player.other().index()].clone();
            if let Some(conn) = self.seats[player.index()].as_mut() {
                conn.set_phase(Phase::Playing);
                let _ = conn.send(&ServerMessage::Name { player, opponent }).await;
            }
        }
    }

    async fn broadcast_play(&mut self) {
        let msg = ServerMessage::Play {
            turn: self.game.turn(),
            board: self.game.board(),
        };
        for conn in self.seats.iter_mut().flatten() {
            let _ = conn.send(&msg).await;
        }
    }

    /// Wait until the current player makes a legal move or the match ends
    async fn await_move(&mut self) -> TurnOutcome {
        let current = self.game.turn();
        let opponent = current.other();

        loop {
            // Covers both sides being gone as well.
            if self.seats[current.index()].is_none() {
                return TurnOutcome::Forfeit;
            }

            let event = {
                let [one, two] = &mut self.seats;
                let (cur, opp) = match current {
                    PlayerNumber::One => (one, two),
                    PlayerNumber::Two => (two, one),
                };

                tokio::select! {
                    biased;
                    raw = read_seat(opp) => Event::Opponent(raw),
                    raw = read_seat(cur) => Event::Current(raw),
                }
            };

            let outcome = match event {
                Event::Opponent(raw) => self.on_opponent_input(opponent, raw).await,
                Event::Current(raw) => self.on_current_input(current, raw).await,
            };
            if let Some(outcome) = outcome {
                return outcome;
            }
        }
    }

    /// Input from the player who is not on turn
    ///
    /// Moves and stray frames are answered and the wait goes on; OPEN or a
    /// lost connection ends the match.
    async fn on_opponent_input(
        &mut self,
        who: PlayerNumber,
        raw: Result<Vec<u8>, FrameError>,
    ) -> Option<TurnOutcome> {
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                info!("Player {} ({}) dropped: {}", who, self.names[who.index()], e);
                self.drop_seat(who).await;
                return Some(TurnOutcome::Forfeit);
            }
        };

        let frame = {
            let conn = self.seats[who.index()].as_mut()?;
            // A rejected frame has already been answered with FAIL 10.
            conn.accept_frame(&raw).await.ok()?
        };

        match frame.kind {
            MessageType::Move => {
                let code = self
                    .game
                    .check_turn(who)
                    .err()
                    .map(ErrorCode::from)
                    .unwrap_or(ErrorCode::Invalid);
                debug!("Player {} moved out of turn", who);
                self.send_to(who, code.into()).await;
                None
            }
            MessageType::Open => {
                self.send_to(who, ErrorCode::AlreadyOpen.into()).await;
                self.drop_seat(who).await;
                Some(TurnOutcome::Forfeit)
            }
            _ => {
                self.send_to(who, ErrorCode::Invalid.into()).await;
                None
            }
        }
    }

    /// Input from the player on turn
    ///
    /// Anything but a well-formed MOVE is fatal to that side. A legal-looking
    /// MOVE the rules reject is answered and the player tries again.
    async fn on_current_input(
        &mut self,
        who: PlayerNumber,
        raw: Result<Vec<u8>, FrameError>,
    ) -> Option<TurnOutcome> {
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                info!("Player {} ({}) dropped: {}", who, self.names[who.index()], e);
                self.drop_seat(who).await;
                return Some(TurnOutcome::Forfeit);
            }
        };

        let accepted = match self.seats[who.index()].as_mut() {
            Some(conn) => conn.accept_frame(&raw).await,
            None => return Some(TurnOutcome::Forfeit),
        };
        let Ok(frame) = accepted else {
            self.drop_seat(who).await;
            return Some(TurnOutcome::Forfeit);
        };

        if frame.kind == MessageType::Open {
            self.send_to(who, ErrorCode::AlreadyOpen.into()).await;
            self.drop_seat(who).await;
            return Some(TurnOutcome::Forfeit);
        }

        let Ok(ClientMessage::Move { pile, quantity }) = ClientMessage::from_frame(&frame) else {
            self.send_to(who, ErrorCode::Invalid.into()).await;
            self.drop_seat(who).await;
            return Some(TurnOutcome::Forfeit);
        };

        match self.game.apply_move(who, pile, quantity) {
            Ok(()) => {
                info!(
                    "Player {} took {} from pile {}: {}",
                    who,
                    quantity,
                    pile,
                    self.game.board()
                );
                Some(TurnOutcome::Moved)
            }
            Err(e) => {
                debug!("Player {} move rejected: {}", who, e);
                self.send_to(who, ErrorCode::from(e).into()).await;
                None
            }
        }
    }

    /// Send OVER to every remaining player
    async fn conclude(&mut self, forfeit: bool) {
        let remaining: Vec<PlayerNumber> = PlayerNumber::both()
            .into_iter()
            .filter(|p| self.seats[p.index()].is_some())
            .collect();

        let winner = match remaining.as_slice() {
            [only] if forfeit => *only,
            _ => self.game.winner(),
        };
        let reason = if forfeit { FORFEIT_REASON } else { "" };

        let winner_name = &self.names[winner.index()];
        if forfeit {
            info!("Match over: player {} ({}) wins by forfeit", winner, winner_name);
        } else {
            info!("Match over: player {} ({}) wins", winner, winner_name);
        }

        let msg = ServerMessage::Over {
            winner,
            board: self.game.board(),
            reason: reason.to_string(),
        };
        for conn in self.seats.iter_mut().flatten() {
            let _ = conn.send(&msg).await;
        }
    }

    /// Drop both players from the waiting list and release their sockets
    async fn close(mut self) {
        for id in self.game.players {
            self.matchmaker.unregister(id);
        }
        for conn in self.seats.iter_mut().filter_map(Option::take) {
            conn.close().await;
        }
        debug!("Session for '{}' and '{}' closed", self.names[0], self.names[1]);
    }

    async fn send_to(&mut self, who: PlayerNumber, msg: ServerMessage) {
        if let Some(conn) = self.seats[who.index()].as_mut() {
            let _ = conn.send(&msg).await;
        }
    }

    /// Tear down one side
    async fn drop_seat(&mut self, who: PlayerNumber) {
        if let Some(conn) = self.seats[who.index()].take() {
            conn.close().await;
        }
    }
}

/// Read from a seat, or never resolve if the seat is empty
async fn read_seat(seat: &mut Option<Connection>) -> Result<Vec<u8>, FrameError> {
    match seat {
        Some(conn) => conn.read_chunk().await,
        None => std::future::pending().await,
    }
}

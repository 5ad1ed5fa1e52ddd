//! Matchmaker
//!
//! Shared waiting list of opened connections. Enforces name uniqueness,
//! pairs the two earliest unclaimed entries and launches a session for
//! them. Every read or mutation of the list happens under one lock.
//!
//! Entries are claimed at pairing time but only removed when the session
//! ends, so a name stays reserved for the whole match.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::RegisterError;
use crate::session::Session;
use crate::types::ClientId;

/// Channel a claimed connection's handler uses to give up its socket
pub type Handoff = oneshot::Sender<Connection>;

/// Waiting-list entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatStatus {
    /// Eligible for pairing
    Waiting,
    /// Claimed by a session; removed when the session ends
    InGame,
}

#[derive(Debug)]
struct Entry {
    id: ClientId,
    name: String,
    status: SeatStatus,
    claim: Option<oneshot::Sender<Handoff>>,
}

/// One side of a freshly made pairing
#[derive(Debug)]
pub struct Claimed {
    pub id: ClientId,
    pub name: String,
    /// Resolves with the connection once its handler hands it over
    pub connection: oneshot::Receiver<Connection>,
}

/// Two claimed entries, earliest arrival first
#[derive(Debug)]
pub struct Pairing {
    pub first: Claimed,
    pub second: Claimed,
}

/// The matchmaking service
///
/// Owned by the server and shared by reference with every handler and
/// session task.
#[derive(Debug)]
pub struct Matchmaker {
    /// Arrival-ordered waiting list
    queue: Mutex<Vec<Entry>>,
    capacity: usize,
    poll_interval: Duration,
    active_sessions: AtomicUsize,
    idle: Notify,
}

impl Matchmaker {
    pub fn new(capacity: usize, poll_interval: Duration) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            capacity,
            poll_interval,
            active_sessions: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.queue_capacity, config.queue_poll_interval())
    }

    /// Interval at which a queued handler re-checks for a match
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit an opened connection to the waiting list
    ///
    /// `claim` receives a [`Handoff`] when the entry is paired.
    pub fn register(
        &self,
        id: ClientId,
        name: &str,
        claim: oneshot::Sender<Handoff>,
    ) -> Result<(), RegisterError> {
        let mut queue = self.lock();

        if queue.iter().any(|e| e.name == name) {
            return Err(RegisterError::NameTaken(name.to_string()));
        }
        if queue.len() >= self.capacity {
            return Err(RegisterError::QueueFull);
        }

        queue.push(Entry {
            id,
            name: name.to_string(),
            status: SeatStatus::Waiting,
            claim: Some(claim),
        });

        info!("'{}' ({}) queued, {} in list", name, id, queue.len());
        Ok(())
    }

    /// Claim the two earliest waiting entries, if there are two
    ///
    /// Both entries stay in the list with status `InGame`. Each entry's
    /// handler is sent a hand-off channel; the receiving ends are returned.
    pub fn claim_pair(&self) -> Option<Pairing> {
        let mut queue = self.lock();

        let mut waiting = queue
            .iter()
            .enumerate()
            .filter(|(_, e)| e.status == SeatStatus::Waiting)
            .map(|(i, _)| i);
        let first = waiting.next()?;
        let second = waiting.next()?;

        let mut claim = |index: usize| {
            let entry = &mut queue[index];
            entry.status = SeatStatus::InGame;

            let (tx, rx) = oneshot::channel();
            if let Some(notify) = entry.claim.take() {
                // A dropped receiver leaves `rx` closed; the session treats
                // that side as disconnected.
                let _ = notify.send(tx);
            }

            Claimed {
                id: entry.id,
                name: entry.name.clone(),
                connection: rx,
            }
        };

        let first = claim(first);
        let second = claim(second);
        Some(Pairing { first, second })
    }

    /// Pair the two earliest waiting entries and launch their session
    pub fn try_pair(self: &Arc<Self>) -> bool {
        let Some(pairing) = self.claim_pair() else {
            return false;
        };

        info!(
            "Paired '{}' with '{}'",
            pairing.first.name, pairing.second.name
        );

        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        let matchmaker = Arc::clone(self);
        tokio::spawn(async move {
            Session::start(pairing, Arc::clone(&matchmaker)).await;
            matchmaker.session_finished();
        });
        true
    }

    /// Remove an entry; no-op if it is already gone
    pub fn unregister(&self, id: ClientId) {
        let mut queue = self.lock();
        if let Some(index) = queue.iter().position(|e| e.id == id) {
            let entry = queue.remove(index);
            debug!("'{}' ({}) removed from waiting list", entry.name, id);
        }
    }

    /// Entries not yet claimed by a session
    pub fn count_eligible(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.status == SeatStatus::Waiting)
            .count()
    }

    /// Entries physically present, claimed or not
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Status of an entry, if present
    #[cfg(test)]
    pub fn status(&self, id: ClientId) -> Option<SeatStatus> {
        self.lock().iter().find(|e| e.id == id).map(|e| e.status)
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    fn session_finished(&self) {
        if self.active_sessions.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Resolve once no session is running
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.active_sessions() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn matchmaker(capacity: usize) -> Matchmaker {
        Matchmaker::new(capacity, Duration::from_millis(10))
    }

    fn enqueue(mm: &Matchmaker, name: &str) -> (ClientId, oneshot::Receiver<Handoff>) {
        let id = ClientId::new();
        let (tx, rx) = oneshot::channel();
        mm.register(id, name, tx).unwrap();
        (id, rx)
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mm = matchmaker(8);
        let _alice = enqueue(&mm, "Alice");

        let (tx, _rx) = oneshot::channel();
        assert_eq!(
            mm.register(ClientId::new(), "Alice", tx),
            Err(RegisterError::NameTaken("Alice".to_string()))
        );
        assert_eq!(mm.len(), 1);
    }

    #[test]
    fn test_register_rejects_when_full() {
        let mm = matchmaker(2);
        let _a = enqueue(&mm, "A");
        let _b = enqueue(&mm, "B");

        let (tx, _rx) = oneshot::channel();
        assert_eq!(
            mm.register(ClientId::new(), "C", tx),
            Err(RegisterError::QueueFull)
        );
    }

    #[test]
    fn test_concurrent_same_name_only_one_wins() {
        let mm = Arc::new(matchmaker(64));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mm = Arc::clone(&mm);
                thread::spawn(move || {
                    let (tx, rx) = oneshot::channel();
                    let result = mm.register(ClientId::new(), "Alice", tx);
                    drop(rx);
                    result
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == RegisterError::NameTaken("Alice".to_string())));
    }

    #[test]
    fn test_claim_pair_needs_two_waiting() {
        let mm = matchmaker(8);
        assert!(mm.claim_pair().is_none());

        let _alice = enqueue(&mm, "Alice");
        assert!(mm.claim_pair().is_none());
        assert_eq!(mm.count_eligible(), 1);
    }

    #[test]
    fn test_claim_pair_marks_but_keeps_entries() {
        let mm = matchmaker(8);
        let (alice, mut alice_claim) = enqueue(&mm, "Alice");
        let (bob, mut bob_claim) = enqueue(&mm, "Bob");
        let (carol, _carol_claim) = enqueue(&mm, "Carol");

        let pairing = mm.claim_pair().unwrap();
        assert_eq!(pairing.first.id, alice);
        assert_eq!(pairing.second.id, bob);
        assert_eq!(pairing.first.name, "Alice");

        // Claimed entries remain until the session cleans up.
        assert_eq!(mm.len(), 3);
        assert_eq!(mm.count_eligible(), 1);
        assert_eq!(mm.status(alice), Some(SeatStatus::InGame));
        assert_eq!(mm.status(carol), Some(SeatStatus::Waiting));

        // Both handlers were told about the claim.
        assert!(alice_claim.try_recv().is_ok());
        assert!(bob_claim.try_recv().is_ok());

        // Names stay reserved while in game.
        let (tx, _rx) = oneshot::channel();
        assert!(mm.register(ClientId::new(), "Bob", tx).is_err());
    }

    #[test]
    fn test_claimed_handoff_reaches_session_side() {
        let mm = matchmaker(8);
        let (_alice, mut alice_claim) = enqueue(&mm, "Alice");
        let (_bob, bob_claim) = enqueue(&mm, "Bob");
        drop(bob_claim);

        let mut pairing = mm.claim_pair().unwrap();
        let alice_handoff = alice_claim.try_recv().unwrap();
        assert!(!alice_handoff.is_closed());

        // Bob's handler is gone, so his side can never be delivered.
        assert!(pairing.second.connection.try_recv().is_err());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mm = matchmaker(8);
        let (alice, _claim) = enqueue(&mm, "Alice");

        mm.unregister(alice);
        assert!(mm.is_empty());
        mm.unregister(alice);
        assert!(mm.is_empty());

        // The name is free again.
        let _again = enqueue(&mm, "Alice");
        assert_eq!(mm.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_idle_without_sessions() {
        let mm = matchmaker(8);
        assert_eq!(mm.active_sessions(), 0);
        mm.wait_idle().await;
    }
}

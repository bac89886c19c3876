//! Correlation registry: the bookkeeping table of in-flight calls.
//!
//! Every outbound call registers a [`PendingReply`] keyed by a fresh
//! correlation id. The reply listener is the only writer of result slots;
//! waiting callers are the only readers. The registry performs no I/O.
//!
//! Entry removal is the synchronization point: [`DashMap::remove`] is
//! atomic, so whichever side removes the entry first (listener resolving,
//! caller expiring, or the handle being dropped) owns it, and the loser's
//! action is a no-op. A result slot is therefore written at most once.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use gazette_core::CorrelationId;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};

/// One in-flight call: the sending half of its result slot plus deadlines.
#[derive(Debug)]
struct PendingEntry {
    slot: oneshot::Sender<Bytes>,
    registered_at: Instant,
    deadline: Instant,
}

/// Process-wide table of outstanding calls, shared by every caller task
/// and the reply listener. Holds no state beyond currently pending calls.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: Arc<DashMap<CorrelationId, PendingEntry>>,
}

impl CorrelationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending call with the given timeout, returning the
    /// caller's handle. The correlation id is minted here so registration
    /// always precedes publication -- a reply can never race an
    /// unregistered id.
    #[must_use]
    pub fn register(&self, timeout: Duration) -> PendingReply {
        let id = CorrelationId::mint();
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        let deadline = now + timeout;

        self.pending.insert(
            id,
            PendingEntry {
                slot: tx,
                registered_at: now,
                deadline,
            },
        );

        PendingReply {
            id,
            deadline,
            rx,
            pending: Arc::clone(&self.pending),
        }
    }

    /// Fulfils the pending call registered under `id`.
    ///
    /// Returns `true` if a matching call existed and its waiter received
    /// the payload. Returns `false` for unknown ids (the call already
    /// timed out, or the reply belongs to another instance) and for
    /// waiters that vanished between removal and delivery -- both are
    /// discards, not errors.
    pub fn resolve(&self, id: CorrelationId, payload: Bytes) -> bool {
        match self.pending.remove(&id) {
            Some((_, entry)) => entry.slot.send(payload).is_ok(),
            None => false,
        }
    }

    /// Removes a call whose deadline passed, failing its slot by dropping
    /// the sender. Idempotent: expiring an already-resolved or unknown id
    /// returns `false` and changes nothing.
    pub fn expire(&self, id: CorrelationId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Drops every entry whose deadline is at or before `now`, returning
    /// how many were removed. Covers callers that disappeared without
    /// their handle's drop running (e.g. an aborted task); the normal
    /// expiry path is the caller's own timeout.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, entry| entry.deadline > now);
        before.saturating_sub(self.pending.len())
    }

    /// Number of currently outstanding calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Caller-side handle to one outstanding call.
///
/// Dropping the handle unregisters the call, so an abandoned caller never
/// leaks a registry entry; the late reply then becomes an unmatched
/// discard in the listener.
#[derive(Debug)]
pub struct PendingReply {
    id: CorrelationId,
    deadline: Instant,
    rx: oneshot::Receiver<Bytes>,
    pending: Arc<DashMap<CorrelationId, PendingEntry>>,
}

impl PendingReply {
    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        self.id
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Waits for the result slot to be fulfilled.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot was dropped unfulfilled -- the entry
    /// was expired (timeout or sweep) before any reply matched.
    pub async fn recv(&mut self) -> Result<Bytes, oneshot::error::RecvError> {
        (&mut self.rx).await
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        // No-op when the entry was already resolved or expired.
        self.pending.remove(&self.id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_payload_to_waiter() {
        let registry = CorrelationRegistry::new();
        let mut pending = registry.register(Duration::from_secs(5));

        assert!(registry.resolve(pending.correlation_id(), Bytes::from_static(b"pong")));
        assert_eq!(pending.recv().await.unwrap(), Bytes::from_static(b"pong"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn resolve_unknown_id_is_a_noop() {
        let registry = CorrelationRegistry::new();
        assert!(!registry.resolve(CorrelationId::mint(), Bytes::new()));
    }

    #[tokio::test]
    async fn second_resolve_is_silently_ignored() {
        let registry = CorrelationRegistry::new();
        let mut pending = registry.register(Duration::from_secs(5));
        let id = pending.correlation_id();

        assert!(registry.resolve(id, Bytes::from_static(b"first")));
        assert!(!registry.resolve(id, Bytes::from_static(b"second")));
        // The waiter observes only the first write.
        assert_eq!(pending.recv().await.unwrap(), Bytes::from_static(b"first"));
    }

    #[tokio::test]
    async fn expire_fails_the_slot_and_is_idempotent() {
        let registry = CorrelationRegistry::new();
        let mut pending = registry.register(Duration::from_secs(5));
        let id = pending.correlation_id();

        assert!(registry.expire(id));
        assert!(!registry.expire(id));
        assert!(pending.recv().await.is_err());
        // A reply arriving after expiry resolves nothing.
        assert!(!registry.resolve(id, Bytes::from_static(b"late")));
    }

    #[tokio::test]
    async fn dropping_the_handle_unregisters() {
        let registry = CorrelationRegistry::new();
        let pending = registry.register(Duration::from_secs(5));
        let id = pending.correlation_id();
        assert_eq!(registry.len(), 1);

        drop(pending);
        assert!(registry.is_empty());
        assert!(!registry.resolve(id, Bytes::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired_entries() {
        let registry = CorrelationRegistry::new();
        let mut short = registry.register(Duration::from_millis(100));
        let mut long = registry.register(Duration::from_secs(60));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(registry.sweep_expired(Instant::now()), 1);
        assert_eq!(registry.len(), 1);

        // The swept waiter sees a failed slot; the survivor still resolves.
        assert!(short.recv().await.is_err());
        assert!(registry.resolve(long.correlation_id(), Bytes::from_static(b"ok")));
        assert_eq!(long.recv().await.unwrap(), Bytes::from_static(b"ok"));
    }

    #[tokio::test]
    async fn concurrent_calls_resolve_independently_of_order() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut a = registry.register(Duration::from_secs(5));
        let mut b = registry.register(Duration::from_secs(5));

        // Replies arrive in reverse registration order; correlation, not
        // FIFO, decides who gets what.
        assert!(registry.resolve(b.correlation_id(), Bytes::from_static(b"for-b")));
        assert!(registry.resolve(a.correlation_id(), Bytes::from_static(b"for-a")));

        assert_eq!(a.recv().await.unwrap(), Bytes::from_static(b"for-a"));
        assert_eq!(b.recv().await.unwrap(), Bytes::from_static(b"for-b"));
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_at_precedes_deadline() {
        let registry = CorrelationRegistry::new();
        let _pending = registry.register(Duration::from_secs(1));
        let entry = registry.pending.iter().next().unwrap();
        assert!(entry.registered_at < entry.deadline);
    }
}

//! Bus transport abstraction and the in-memory implementation.
//!
//! The bridge core never talks to a broker directly; it publishes and
//! receives raw payload bytes through [`BusTransport`]. Connections and
//! subscriptions are long-lived and shared -- setup is amortized, never
//! per-call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::channel::ReplyChannel;
use super::error::TransportError;

/// Publish/receive access to the message bus.
///
/// `receive` returning `Ok(None)` means the bounded wait elapsed with no
/// message available -- an ordinary outcome, not an error. Implementations
/// must tolerate concurrent use by many simultaneous callers.
#[async_trait]
pub trait BusTransport: Send + Sync + 'static {
    /// Publishes a payload to a topic.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on broker-level failure.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Pulls the next payload from a subscription, waiting at most
    /// `max_wait`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on broker-level failure.
    async fn receive(
        &self,
        channel: &ReplyChannel,
        max_wait: Duration,
    ) -> Result<Option<Bytes>, TransportError>;
}

// ---------------------------------------------------------------------------
// InMemoryBus
// ---------------------------------------------------------------------------

/// One named subscription's message queue.
#[derive(Debug, Default)]
struct SubscriptionQueue {
    messages: Mutex<VecDeque<Bytes>>,
    notify: Notify,
}

impl SubscriptionQueue {
    fn push(&self, payload: Bytes) {
        self.messages.lock().push_back(payload);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Bytes> {
        self.messages.lock().pop_front()
    }
}

/// In-process bus with topic/subscription semantics.
///
/// Publishing delivers a copy of the payload to every subscription of the
/// topic; a topic with no subscriptions drops the message, as a broker
/// would. Used by tests and local single-process runs.
#[derive(Debug, Default)]
pub struct InMemoryBus {
    subscriptions: DashMap<(String, String), Arc<SubscriptionQueue>>,
    publish_counts: DashMap<String, u64>,
}

impl InMemoryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the subscription if it does not exist yet.
    ///
    /// Subscriptions are also created lazily on first `receive`; tests
    /// call this up front so messages published before the first receive
    /// are not dropped.
    pub fn subscribe(&self, topic: &str, subscription: &str) {
        self.subscriptions
            .entry((topic.to_string(), subscription.to_string()))
            .or_default();
    }

    /// How many payloads have been published to `topic`.
    #[must_use]
    pub fn publish_count(&self, topic: &str) -> u64 {
        self.publish_counts.get(topic).map_or(0, |count| *count)
    }

    fn queue(&self, channel: &ReplyChannel) -> Arc<SubscriptionQueue> {
        Arc::clone(
            &self
                .subscriptions
                .entry((channel.topic.clone(), channel.subscription.clone()))
                .or_default(),
        )
    }
}

#[async_trait]
impl BusTransport for InMemoryBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        *self.publish_counts.entry(topic.to_string()).or_insert(0) += 1;

        let payload = Bytes::copy_from_slice(payload);
        for entry in &self.subscriptions {
            if entry.key().0 == topic {
                entry.value().push(payload.clone());
            }
        }
        Ok(())
    }

    async fn receive(
        &self,
        channel: &ReplyChannel,
        max_wait: Duration,
    ) -> Result<Option<Bytes>, TransportError> {
        let queue = self.queue(channel);
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            if let Some(payload) = queue.pop() {
                return Ok(Some(payload));
            }
            let notified = queue.notify.notified();
            tokio::select! {
                () = notified => {}
                () = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

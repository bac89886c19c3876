//! Reply listener: the single receive loop of a reply channel.
//!
//! One listener runs per reply channel for the lifetime of the process,
//! independent of any caller. It pulls inbound envelopes with a bounded
//! wait, resolves the matching pending call, and discards everything
//! else: unmatched ids belong to calls that already timed out or to
//! another instance sharing the topic, and retrying them would starve
//! every other waiter on the channel.

use std::sync::Arc;

use bytes::Bytes;
use gazette_core::ReplyEnvelope;
use metrics::counter;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::channel::{BusConfig, ReplyChannel};
use super::correlation::CorrelationRegistry;
use super::transport::BusTransport;

/// Continuously receives from one reply channel and resolves pending calls.
pub struct ReplyListener {
    transport: Arc<dyn BusTransport>,
    registry: Arc<CorrelationRegistry>,
    channel: ReplyChannel,
    receive_wait: Duration,
    backoff_base: Duration,
    backoff_cap: Duration,
    sweep_interval: Duration,
}

impl ReplyListener {
    #[must_use]
    pub fn new(
        transport: Arc<dyn BusTransport>,
        registry: Arc<CorrelationRegistry>,
        config: &BusConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            channel: config.reply_channel.clone(),
            receive_wait: config.receive_wait,
            backoff_base: config.retry_backoff_base,
            backoff_cap: config.retry_backoff_cap,
            sweep_interval: config.sweep_interval,
        }
    }

    /// Spawns the receive loop; it runs until `shutdown` signals true or
    /// its sender is dropped.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            topic = %self.channel.topic,
            subscription = %self.channel.subscription,
            "reply listener started"
        );

        let mut backoff = self.backoff_base;
        let mut next_sweep = Instant::now() + self.sweep_interval;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = self.transport.receive(&self.channel, self.receive_wait) => {
                    match received {
                        Ok(Some(payload)) => {
                            backoff = self.backoff_base;
                            self.dispatch(&payload);
                        }
                        Ok(None) => {
                            // Bounded wait elapsed with nothing to do.
                            backoff = self.backoff_base;
                        }
                        Err(error) => {
                            counter!("gazette_bus_listener_transport_errors_total").increment(1);
                            warn!(%error, retry_in = ?backoff, "reply channel receive failed");
                            tokio::time::sleep(jittered(backoff)).await;
                            backoff = (backoff * 2).min(self.backoff_cap);
                        }
                    }
                }
            }

            let now = Instant::now();
            if now >= next_sweep {
                let swept = self.registry.sweep_expired(now);
                if swept > 0 {
                    debug!(swept, "dropped expired pending calls");
                }
                next_sweep = now + self.sweep_interval;
            }
        }

        info!(topic = %self.channel.topic, "reply listener stopped");
    }

    /// Matches one inbound envelope against the registry.
    ///
    /// Malformed payloads and unmatched ids are logged and dropped; the
    /// loop must keep making progress for every other pending call on the
    /// channel.
    fn dispatch(&self, payload: &Bytes) {
        match ReplyEnvelope::from_bytes(payload) {
            Ok(envelope) => {
                if self
                    .registry
                    .resolve(envelope.correlation_id, Bytes::from(envelope.payload))
                {
                    counter!("gazette_bus_replies_matched_total").increment(1);
                } else {
                    counter!("gazette_bus_replies_unmatched_total").increment(1);
                    debug!(
                        correlation_id = %envelope.correlation_id,
                        "discarding reply with no pending call"
                    );
                }
            }
            Err(error) => {
                counter!("gazette_bus_replies_malformed_total").increment(1);
                warn!(%error, "discarding malformed reply");
            }
        }
    }
}

/// Adds up to 25% random jitter so restarting instances do not hammer a
/// recovering broker in lockstep.
fn jittered(backoff: Duration) -> Duration {
    let jitter_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX) / 4;
    if jitter_ms == 0 {
        return backoff;
    }
    backoff + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use gazette_core::{CorrelationId, ReplyEnvelope};

    use super::*;
    use crate::bus::error::TransportError;
    use crate::bus::transport::InMemoryBus;

    fn setup() -> (Arc<InMemoryBus>, Arc<CorrelationRegistry>, BusConfig) {
        let config = BusConfig {
            receive_wait: Duration::from_millis(20),
            sweep_interval: Duration::from_millis(50),
            retry_backoff_base: Duration::from_millis(5),
            retry_backoff_cap: Duration::from_millis(20),
            ..BusConfig::default()
        };
        let bus = Arc::new(InMemoryBus::new());
        bus.subscribe(
            &config.reply_channel.topic,
            &config.reply_channel.subscription,
        );
        (bus, Arc::new(CorrelationRegistry::new()), config)
    }

    async fn publish_reply(bus: &InMemoryBus, topic: &str, id: CorrelationId, payload: &[u8]) {
        let envelope = ReplyEnvelope {
            correlation_id: id,
            payload: payload.to_vec(),
        };
        bus.publish(topic, &envelope.to_bytes().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resolves_matching_pending_call() {
        let (bus, registry, config) = setup();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ReplyListener::new(bus.clone(), registry.clone(), &config).spawn(shutdown_rx);

        let mut pending = registry.register(Duration::from_secs(5));
        publish_reply(
            &bus,
            &config.reply_channel.topic,
            pending.correlation_id(),
            b"hello",
        )
        .await;

        assert_eq!(pending.recv().await.unwrap(), Bytes::from_static(b"hello"));
        handle.abort();
    }

    #[tokio::test]
    async fn survives_malformed_and_unmatched_replies() {
        let (bus, registry, config) = setup();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ReplyListener::new(bus.clone(), registry.clone(), &config).spawn(shutdown_rx);

        // Garbage bytes, then a reply for a call nobody registered.
        bus.publish(&config.reply_channel.topic, &[0xc1, 0x00, 0xff])
            .await
            .unwrap();
        publish_reply(
            &bus,
            &config.reply_channel.topic,
            CorrelationId::mint(),
            b"stale",
        )
        .await;

        // The loop keeps matching afterwards.
        let mut pending = registry.register(Duration::from_secs(5));
        publish_reply(
            &bus,
            &config.reply_channel.topic,
            pending.correlation_id(),
            b"alive",
        )
        .await;

        assert_eq!(pending.recv().await.unwrap(), Bytes::from_static(b"alive"));
        handle.abort();
    }

    #[tokio::test]
    async fn interleaved_replies_reach_their_own_callers() {
        let (bus, registry, config) = setup();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ReplyListener::new(bus.clone(), registry.clone(), &config).spawn(shutdown_rx);

        let mut first = registry.register(Duration::from_secs(5));
        let mut second = registry.register(Duration::from_secs(5));

        // Deliver in reverse order on the shared channel.
        publish_reply(
            &bus,
            &config.reply_channel.topic,
            second.correlation_id(),
            b"for-second",
        )
        .await;
        publish_reply(
            &bus,
            &config.reply_channel.topic,
            first.correlation_id(),
            b"for-first",
        )
        .await;

        assert_eq!(
            first.recv().await.unwrap(),
            Bytes::from_static(b"for-first")
        );
        assert_eq!(
            second.recv().await.unwrap(),
            Bytes::from_static(b"for-second")
        );
        handle.abort();
    }

    /// Fails the first N receives, then behaves like the inner bus.
    struct FlakyTransport {
        inner: Arc<InMemoryBus>,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl BusTransport for FlakyTransport {
        async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
            self.inner.publish(topic, payload).await
        }

        async fn receive(
            &self,
            channel: &ReplyChannel,
            max_wait: Duration,
        ) -> Result<Option<Bytes>, TransportError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(TransportError::Unavailable("broker flapping".to_string()));
            }
            self.inner.receive(channel, max_wait).await
        }
    }

    #[tokio::test]
    async fn retries_through_transport_errors_with_backoff() {
        let (bus, registry, config) = setup();
        let flaky = Arc::new(FlakyTransport {
            inner: Arc::clone(&bus),
            failures_left: AtomicU32::new(3),
        });
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ReplyListener::new(flaky, registry.clone(), &config).spawn(shutdown_rx);

        let mut pending = registry.register(Duration::from_secs(5));
        publish_reply(
            &bus,
            &config.reply_channel.topic,
            pending.correlation_id(),
            b"after-recovery",
        )
        .await;

        assert_eq!(
            pending.recv().await.unwrap(),
            Bytes::from_static(b"after-recovery")
        );
        handle.abort();
    }

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let (bus, registry, config) = setup();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ReplyListener::new(bus, registry, &config).spawn(shutdown_rx);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn sweeps_abandoned_registrations() {
        let (bus, registry, config) = setup();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ReplyListener::new(bus, registry.clone(), &config).spawn(shutdown_rx);

        // Leak the handle deliberately: forget() skips Drop-based cleanup,
        // leaving the sweep as the only way out.
        let pending = registry.register(Duration::from_millis(10));
        std::mem::forget(pending);
        assert_eq!(registry.len(), 1);

        tokio::time::timeout(Duration::from_secs(2), async {
            while !registry.is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("sweep should clear the expired entry");
        handle.abort();
    }
}

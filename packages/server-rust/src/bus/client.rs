//! Request/response client: synchronous-looking calls over the bus.
//!
//! `call` is the only public operation: register a pending call, publish
//! the request with a fresh correlation id and this service's reply
//! address, suspend until the reply listener resolves the slot or the
//! deadline elapses.
//!
//! Calls are *not* idempotent by default. A caller that retries after a
//! timeout publishes a new correlation id; if the remote side eventually
//! answers both, each reply matches at most its own id, but the remote
//! action may have executed twice. Higher layers that need idempotence
//! must provide it themselves.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::{counter, histogram};
use tracing::debug;

use super::channel::BusConfig;
use super::correlation::CorrelationRegistry;
use super::error::BusError;
use super::transport::BusTransport;
use gazette_core::RequestEnvelope;

/// Issues correlated request/response calls over a shared transport.
///
/// Cheap to clone behind `Arc`s; any number of caller tasks may invoke
/// [`RequestClient::call`] concurrently.
pub struct RequestClient {
    transport: Arc<dyn BusTransport>,
    registry: Arc<CorrelationRegistry>,
    reply_topic: String,
    default_timeout: Duration,
}

impl RequestClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn BusTransport>,
        registry: Arc<CorrelationRegistry>,
        config: &BusConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            reply_topic: config.reply_channel.topic.clone(),
            default_timeout: config.call_timeout,
        }
    }

    /// The configured per-call deadline.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Publishes `payload` to `destination` and waits for the correlated
    /// reply, using the configured default timeout.
    ///
    /// # Errors
    ///
    /// See [`RequestClient::call_with_timeout`].
    pub async fn call(&self, destination: &str, payload: Vec<u8>) -> Result<Bytes, BusError> {
        self.call_with_timeout(destination, payload, self.default_timeout)
            .await
    }

    /// Publishes `payload` to `destination` and waits for the correlated
    /// reply.
    ///
    /// A call is pending from registration until exactly one terminal
    /// outcome: fulfilled, timed out, or transport-failed. In every case
    /// the registry entry is removed, so a late reply can only become an
    /// unmatched discard in the listener.
    ///
    /// # Errors
    ///
    /// [`BusError::Transport`] if publishing fails (the pending call is
    /// unregistered immediately), [`BusError::Timeout`] if no reply
    /// matches within `timeout`, [`BusError::Malformed`] if the envelope
    /// cannot be encoded.
    pub async fn call_with_timeout(
        &self,
        destination: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Bytes, BusError> {
        counter!("gazette_bus_calls_total", "destination" => destination.to_string())
            .increment(1);

        let mut pending = self.registry.register(timeout);
        let correlation_id = pending.correlation_id();
        debug!(%correlation_id, destination, "publishing request");

        let envelope = RequestEnvelope {
            correlation_id,
            reply_to: self.reply_topic.clone(),
            payload,
        };
        let bytes = envelope.to_bytes()?;

        let started = tokio::time::Instant::now();
        if let Err(error) = self.transport.publish(destination, &bytes).await {
            counter!("gazette_bus_call_transport_failures_total").increment(1);
            // Dropping `pending` unregisters; no orphaned entry survives a
            // failed publish.
            return Err(BusError::Transport(error));
        }

        match tokio::time::timeout(timeout, pending.recv()).await {
            Ok(Ok(reply)) => {
                histogram!("gazette_bus_call_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                Ok(reply)
            }
            // The slot was dropped unfulfilled: the sweep expired this
            // entry before any reply matched.
            Ok(Err(_)) => {
                counter!("gazette_bus_call_timeouts_total").increment(1);
                Err(BusError::Timeout(timeout))
            }
            Err(_) => {
                counter!("gazette_bus_call_timeouts_total").increment(1);
                debug!(%correlation_id, destination, ?timeout, "call timed out");
                Err(BusError::Timeout(timeout))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Error taxonomy of the bus bridge.

use std::time::Duration;

use gazette_core::EnvelopeError;

/// A transport-level fault from the underlying broker.
///
/// Transports treat these as transient: the reply listener retries its
/// receive loop with backoff, and broker clients reconnect internally.
/// The correlation logic itself never retries.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Outcome of a failed request/response call.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// No correlated reply arrived within the deadline. The pending entry
    /// is removed on expiry, so a late reply becomes a harmless discard in
    /// the reply listener.
    #[error("no correlated reply within {0:?}")]
    Timeout(Duration),

    /// Publishing the request (or receiving on the channel) failed at the
    /// transport level.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload was present but could not be encoded or interpreted.
    #[error("malformed message payload: {0}")]
    Malformed(#[from] EnvelopeError),
}

impl BusError {
    /// Short label for metrics and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Malformed(_) => "malformed",
        }
    }
}

//! Wire-level request/reply envelopes for the bus bridge.
//!
//! An outbound request carries a freshly minted [`CorrelationId`] and the
//! reply topic the responder should answer on; the reply carries the same
//! id back. The id is the *only* thing linking the two -- no ordering or
//! FIFO assumption is made about the reply channel.
//!
//! Envelopes use the same `MsgPack` serialization as the message bodies
//! they wrap (`rmp_serde::to_vec_named()`), with `camelCase` field names.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token linking an outbound request to its inbound reply.
///
/// Minted per call from 122 bits of randomness (UUID v4), which makes a
/// collision among concurrently pending calls vanishingly unlikely -- a
/// collision would mis-deliver a reply, so uniqueness is a correctness
/// requirement here, not an optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Mints a fresh random correlation id.
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error produced while encoding or decoding an envelope or message body.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// The wire-level outbound request published to a destination topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub correlation_id: CorrelationId,
    /// Topic the responder must publish its reply to.
    pub reply_to: String,
    /// MsgPack-encoded request body.
    #[serde(with = "serde_bytes_compat")]
    pub payload: Vec<u8>,
}

/// The wire-level reply observed by the reply listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope {
    pub correlation_id: CorrelationId,
    /// MsgPack-encoded response body.
    #[serde(with = "serde_bytes_compat")]
    pub payload: Vec<u8>,
}

impl RequestEnvelope {
    /// Encodes the envelope for publishing.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decodes an envelope received from a request topic.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Decode`] on malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl ReplyEnvelope {
    /// Encodes the envelope for publishing on a reply topic.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decodes an envelope pulled from the reply channel.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Decode`] on malformed input. The reply
    /// listener treats this as a discard, never a crash.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Encodes a message body for embedding in an envelope payload.
///
/// # Errors
///
/// Returns [`EnvelopeError::Encode`] if serialization fails.
pub fn encode_body<T: Serialize>(body: &T) -> Result<Vec<u8>, EnvelopeError> {
    Ok(rmp_serde::to_vec_named(body)?)
}

/// Decodes a message body from an envelope payload.
///
/// # Errors
///
/// Returns [`EnvelopeError::Decode`] on malformed input.
pub fn decode_body<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, EnvelopeError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Serializes `Vec<u8>` payloads as MsgPack bin rather than an int array.
mod serde_bytes_compat {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        serde_bytes::ByteBuf::deserialize(deserializer).map(serde_bytes::ByteBuf::into_vec)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_envelope_preserves_correlation_id() {
        let envelope = RequestEnvelope {
            correlation_id: CorrelationId::mint(),
            reply_to: "articles.replies".to_string(),
            payload: vec![1, 2, 3],
        };
        let decoded = RequestEnvelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn reply_envelope_round_trips_with_empty_payload() {
        let envelope = ReplyEnvelope {
            correlation_id: CorrelationId::mint(),
            payload: Vec::new(),
        };
        let decoded = ReplyEnvelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn malformed_reply_is_a_decode_error() {
        let err = ReplyEnvelope::from_bytes(&[0xc1, 0xff, 0x00]).unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[test]
    fn minted_ids_are_unique() {
        let a = CorrelationId::mint();
        let b = CorrelationId::mint();
        assert_ne!(a, b);
    }
}

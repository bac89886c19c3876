//! Gazette Core -- identifiers, article DTOs, bus envelopes, and call contracts.
//!
//! This crate holds everything that crosses a process boundary: the JSON
//! shapes served over HTTP and the MsgPack shapes published on the bus.
//! It performs no I/O and has no async runtime dependency.

pub mod articles;
pub mod envelope;
pub mod messages;
pub mod types;

pub use articles::{ArticleCreate, ArticleDetail, ArticleSummary, ArticleUpdate, CommentView};
pub use envelope::{CorrelationId, EnvelopeError, ReplyEnvelope, RequestEnvelope};
pub use types::{ArticleId, Comment, CommentId, Page, PageParams, UserId};

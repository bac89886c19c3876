//! Request/response bridge over the publish/subscribe bus.
//!
//! HTTP handlers need answers from independently-owned services (comments,
//! profiles) whose only transport is an asynchronous bus shared by many
//! concurrent callers. This module makes those exchanges look like plain
//! RPC:
//!
//! 1. **Correlation registry** (`correlation`): table of in-flight calls,
//!    each a single-assignment result slot keyed by correlation id
//! 2. **Reply listener** (`listener`): the one receive loop per reply
//!    channel; resolves matching slots, discards everything else
//! 3. **Request client** (`client`): register, publish, await, unregister
//! 4. **Transports** (`transport`, `nats`): long-lived publish/receive
//!    plumbing behind the [`BusTransport`] trait

pub mod channel;
pub mod client;
pub mod correlation;
pub mod error;
pub mod listener;
#[cfg(feature = "nats")]
pub mod nats;
pub mod transport;

pub use channel::{BusConfig, ReplyChannel, RequestTopics};
pub use client::RequestClient;
pub use correlation::{CorrelationRegistry, PendingReply};
pub use error::{BusError, TransportError};
pub use listener::ReplyListener;
#[cfg(feature = "nats")]
pub use nats::NatsBus;
pub use transport::{BusTransport, InMemoryBus};

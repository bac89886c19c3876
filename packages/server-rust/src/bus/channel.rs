//! Bus addressing and bridge configuration.
//!
//! An addressable channel is pure configuration: a topic name plus, for
//! reply channels, the named durable subscription only this service's
//! instances read from. Nothing here performs I/O.

use std::time::Duration;

use gazette_core::messages::topics;

/// The reply address of this service: a topic plus the durable
/// subscription that filters it. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyChannel {
    /// Topic remote responders publish replies to (sent as `reply_to`).
    pub topic: String,
    /// Durable subscription name; all instances of this service share it.
    pub subscription: String,
}

impl ReplyChannel {
    #[must_use]
    pub fn new(topic: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subscription: subscription.into(),
        }
    }
}

/// Request topic names for the three logical remote operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTopics {
    pub comments_for_article: String,
    pub comment_counts_for_articles: String,
    pub user_names_for_users: String,
}

impl Default for RequestTopics {
    fn default() -> Self {
        Self {
            comments_for_article: topics::COMMENTS_FOR_ARTICLE.to_string(),
            comment_counts_for_articles: topics::COMMENT_COUNTS_FOR_ARTICLES.to_string(),
            user_names_for_users: topics::USER_NAMES_FOR_USERS.to_string(),
        }
    }
}

/// Configuration for the request/response bridge.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Where replies to this service arrive.
    pub reply_channel: ReplyChannel,
    /// Destination topics per logical operation.
    pub topics: RequestTopics,
    /// Default deadline applied to each outbound call.
    pub call_timeout: Duration,
    /// Upper bound on a single blocking receive in the reply listener.
    pub receive_wait: Duration,
    /// Initial backoff after a transport error in the reply listener.
    pub retry_backoff_base: Duration,
    /// Backoff ceiling; doubling stops here.
    pub retry_backoff_cap: Duration,
    /// How often the listener sweeps expired registry entries.
    pub sweep_interval: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            reply_channel: ReplyChannel::new("articles.replies", "articles-server"),
            topics: RequestTopics::default(),
            call_timeout: Duration::from_secs(5),
            receive_wait: Duration::from_secs(1),
            retry_backoff_base: Duration::from_millis(100),
            retry_backoff_cap: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

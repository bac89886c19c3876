//! Typed gateway over the request/response client.
//!
//! One method per logical remote operation, each mapping to exactly one
//! outbound call. The batched lookups take the whole id set in a single
//! request -- fan-out is bounded by the number of lookups, never by the
//! number of ids.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gazette_core::envelope::{decode_body, encode_body};
use gazette_core::messages::{
    CommentCountsForArticlesRequest, CommentCountsForArticlesResponse, CommentsForArticleRequest,
    CommentsForArticleResponse, UserNamesForUsersRequest, UserNamesForUsersResponse,
};
use gazette_core::{ArticleId, Comment, UserId};

use crate::bus::{BusError, RequestClient, RequestTopics};

/// The three remote lookups the aggregation layer depends on.
///
/// A trait seam so service tests can script outcomes without a bus.
#[async_trait]
pub trait RemoteLookups: Send + Sync + 'static {
    /// All comments of one article.
    async fn comments_for_article(&self, article_id: ArticleId)
        -> Result<Vec<Comment>, BusError>;

    /// Comment counts for a batch of articles; one call for all ids.
    /// Ids the remote cannot resolve are absent from the map.
    async fn comment_counts(
        &self,
        article_ids: &[ArticleId],
    ) -> Result<HashMap<ArticleId, u64>, BusError>;

    /// Display names for a batch of users; one call for all ids.
    /// Ids the remote cannot resolve are absent from the map.
    async fn user_names(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, String>, BusError>;
}

/// [`RemoteLookups`] implemented over the bus bridge.
pub struct BusRemoteLookups {
    client: Arc<RequestClient>,
    topics: RequestTopics,
}

impl BusRemoteLookups {
    #[must_use]
    pub fn new(client: Arc<RequestClient>, topics: RequestTopics) -> Self {
        Self { client, topics }
    }
}

#[async_trait]
impl RemoteLookups for BusRemoteLookups {
    async fn comments_for_article(
        &self,
        article_id: ArticleId,
    ) -> Result<Vec<Comment>, BusError> {
        let payload = encode_body(&CommentsForArticleRequest { article_id })?;
        let reply = self
            .client
            .call(&self.topics.comments_for_article, payload)
            .await?;
        let response: CommentsForArticleResponse = decode_body(&reply)?;
        Ok(response.comments)
    }

    async fn comment_counts(
        &self,
        article_ids: &[ArticleId],
    ) -> Result<HashMap<ArticleId, u64>, BusError> {
        if article_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let payload = encode_body(&CommentCountsForArticlesRequest {
            article_ids: article_ids.to_vec(),
        })?;
        let reply = self
            .client
            .call(&self.topics.comment_counts_for_articles, payload)
            .await?;
        let response: CommentCountsForArticlesResponse = decode_body(&reply)?;
        Ok(response.counts)
    }

    async fn user_names(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, String>, BusError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let payload = encode_body(&UserNamesForUsersRequest {
            user_ids: user_ids.to_vec(),
        })?;
        let reply = self
            .client
            .call(&self.topics.user_names_for_users, payload)
            .await?;
        let response: UserNamesForUsersResponse = decode_body(&reply)?;
        Ok(response.names)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::watch;

    use super::*;
    use crate::bus::{
        BusConfig, BusTransport, CorrelationRegistry, InMemoryBus, ReplyChannel, ReplyListener,
    };
    use gazette_core::{ReplyEnvelope, RequestEnvelope};

    /// Wires bus + listener + client and spawns a responder for `topic`
    /// that answers every request with `make_reply(request payload)`.
    fn harness<F>(
        topic: &'static str,
        make_reply: F,
    ) -> (Arc<InMemoryBus>, BusRemoteLookups, tokio::task::JoinHandle<()>)
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let config = BusConfig {
            receive_wait: Duration::from_millis(20),
            call_timeout: Duration::from_secs(2),
            ..BusConfig::default()
        };
        let bus = Arc::new(InMemoryBus::new());
        bus.subscribe(
            &config.reply_channel.topic,
            &config.reply_channel.subscription,
        );
        bus.subscribe(topic, "responder");

        let registry = Arc::new(CorrelationRegistry::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Keep the listener alive for the test's duration.
        std::mem::forget(shutdown_tx);
        let listener_handle =
            ReplyListener::new(bus.clone(), registry.clone(), &config).spawn(shutdown_rx);

        let responder_bus = Arc::clone(&bus);
        tokio::spawn(async move {
            let channel = ReplyChannel::new(topic, "responder");
            loop {
                let Ok(Some(raw)) = responder_bus
                    .receive(&channel, Duration::from_secs(5))
                    .await
                else {
                    continue;
                };
                let request = RequestEnvelope::from_bytes(&raw).unwrap();
                let reply = ReplyEnvelope {
                    correlation_id: request.correlation_id,
                    payload: make_reply(&request.payload),
                };
                responder_bus
                    .publish(&request.reply_to, &reply.to_bytes().unwrap())
                    .await
                    .unwrap();
            }
        });

        let client = Arc::new(RequestClient::new(bus.clone(), registry, &config));
        let lookups = BusRemoteLookups::new(client, config.topics.clone());
        (bus, lookups, listener_handle)
    }

    #[tokio::test]
    async fn comment_counts_issues_one_call_for_many_ids() {
        let (bus, lookups, listener) = harness("comments.counts", |payload| {
            let request: CommentCountsForArticlesRequest = decode_body(payload).unwrap();
            let counts = request
                .article_ids
                .iter()
                .map(|id| (*id, 7_u64))
                .collect::<HashMap<_, _>>();
            encode_body(&CommentCountsForArticlesResponse { counts }).unwrap()
        });

        let ids: Vec<ArticleId> = (0..25).map(|_| ArticleId::random()).collect();
        let counts = lookups.comment_counts(&ids).await.unwrap();

        assert_eq!(counts.len(), 25);
        assert_eq!(
            bus.publish_count("comments.counts"),
            1,
            "one call for N ids, not N calls"
        );
        listener.abort();
    }

    #[tokio::test]
    async fn user_names_issues_one_call_for_many_ids() {
        let (bus, lookups, listener) = harness("users.names", |payload| {
            let request: UserNamesForUsersRequest = decode_body(payload).unwrap();
            let names = request
                .user_ids
                .iter()
                .map(|id| (*id, format!("user-{id}")))
                .collect::<HashMap<_, _>>();
            encode_body(&UserNamesForUsersResponse { names }).unwrap()
        });

        let ids: Vec<UserId> = (0..10).map(|_| UserId::random()).collect();
        let names = lookups.user_names(&ids).await.unwrap();

        assert_eq!(names.len(), 10);
        assert_eq!(bus.publish_count("users.names"), 1);
        listener.abort();
    }

    #[tokio::test]
    async fn empty_id_batches_skip_the_bus_entirely() {
        let (bus, lookups, listener) = harness("comments.counts", |_| Vec::new());

        assert!(lookups.comment_counts(&[]).await.unwrap().is_empty());
        assert!(lookups.user_names(&[]).await.unwrap().is_empty());
        assert_eq!(bus.publish_count("comments.counts"), 0);
        assert_eq!(bus.publish_count("users.names"), 0);
        listener.abort();
    }

    #[tokio::test]
    async fn undecodable_response_body_is_malformed() {
        let (_bus, lookups, listener) =
            harness("comments.list", |_| vec![0xc1, 0x00]);

        let err = lookups
            .comments_for_article(ArticleId::random())
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Malformed(_)));
        listener.abort();
    }
}

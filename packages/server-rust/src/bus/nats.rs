//! NATS-backed [`BusTransport`] (enabled by the `nats` cargo feature).
//!
//! Addressing maps directly: a topic is a NATS subject, and a reply
//! channel's durable subscription is a queue group, so all instances of
//! this service share one logical reply consumer. The client and its
//! queue subscribers are long-lived; nothing is set up per call.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{Client, Subscriber};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use super::channel::ReplyChannel;
use super::error::TransportError;
use super::transport::BusTransport;

/// [`BusTransport`] over a NATS core connection.
pub struct NatsBus {
    client: Client,
    subscribers: DashMap<(String, String), Arc<Mutex<Subscriber>>>,
}

impl NatsBus {
    /// Connects to the broker at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] when the connection cannot
    /// be established.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            subscribers: DashMap::new(),
        })
    }

    /// Returns the long-lived queue subscriber for `channel`, creating it
    /// on first use. Creation happens outside the map guard; if two tasks
    /// race, the loser's subscriber is dropped and unsubscribes itself.
    async fn subscriber(
        &self,
        channel: &ReplyChannel,
    ) -> Result<Arc<Mutex<Subscriber>>, TransportError> {
        let key = (channel.topic.clone(), channel.subscription.clone());
        if let Some(existing) = self.subscribers.get(&key) {
            return Ok(Arc::clone(&existing));
        }

        let subscriber = self
            .client
            .queue_subscribe(channel.topic.clone(), channel.subscription.clone())
            .await
            .map_err(|e| TransportError::Receive(e.to_string()))?;

        let entry = self
            .subscribers
            .entry(key)
            .or_insert_with(move || Arc::new(Mutex::new(subscriber)));
        Ok(Arc::clone(&entry))
    }
}

#[async_trait]
impl BusTransport for NatsBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.client
            .publish(topic.to_string(), Bytes::copy_from_slice(payload))
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;
        // Request/response latency matters more than batching here.
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))
    }

    async fn receive(
        &self,
        channel: &ReplyChannel,
        max_wait: Duration,
    ) -> Result<Option<Bytes>, TransportError> {
        let subscriber = self.subscriber(channel).await?;
        let mut subscriber = subscriber.lock().await;

        match tokio::time::timeout(max_wait, subscriber.next()).await {
            Ok(Some(message)) => Ok(Some(message.payload)),
            Ok(None) => Err(TransportError::Receive(
                "subscription closed".to_string(),
            )),
            Err(_) => Ok(None),
        }
    }
}

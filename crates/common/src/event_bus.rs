//! In-process pub/sub keyed by [`Topic`].
//!
//! Each topic owns a `broadcast` channel created lazily by the first publish
//! or subscribe. Services publish domain events after a successful write;
//! subscribers that fall behind by more than the buffer lose the oldest
//! events (`RecvError::Lagged`).

use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{debug, trace, warn};

const DEFAULT_BUFFER: usize = 256;
const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic(pub &'static str);

impl Topic {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Событие вместе с темой и временем публикации
#[derive(Debug, Clone)]
pub struct EventEnvelope<T> {
    pub topic: Topic,
    pub payload: T,
    /// Unix epoch millis at publish
    pub ts_ms: i64,
}

type Channels<T> = HashMap<Topic, broadcast::Sender<EventEnvelope<T>>>;

/// Cloning shares the underlying topics.
#[derive(Clone)]
pub struct EventBus<T> {
    channels: Arc<RwLock<Channels<T>>>,
    buffer: usize,
    publish_timeout: Duration,
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER, DEFAULT_PUBLISH_TIMEOUT)
    }
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    pub fn new(buffer: usize, publish_timeout: Duration) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
            publish_timeout,
        }
    }

    async fn channel(&self, topic: Topic) -> broadcast::Sender<EventEnvelope<T>> {
        if let Some(tx) = self.channels.read().await.get(&topic) {
            return tx.clone();
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(topic)
            .or_insert_with(|| {
                debug!(target: "event_bus", %topic, "topic opened");
                broadcast::channel(self.buffer).0
            })
            .clone()
    }

    /// Delivers `payload` to current subscribers of `topic` and returns how
    /// many received it. Publishing without subscribers is not an error.
    pub async fn publish(&self, topic: Topic, payload: T) -> usize {
        let envelope = EventEnvelope {
            topic,
            payload,
            ts_ms: Utc::now().timestamp_millis(),
        };

        let delivered = match timeout(self.publish_timeout, self.channel(topic)).await {
            Ok(tx) => tx.send(envelope).unwrap_or(0),
            Err(_) => {
                warn!(target: "event_bus", %topic, "publish timed out waiting for topic registry");
                return 0;
            }
        };

        trace!(target: "event_bus", %topic, delivered, "event published");
        delivered
    }

    pub async fn subscribe(&self, topic: Topic) -> broadcast::Receiver<EventEnvelope<T>> {
        self.channel(topic).await.subscribe()
    }

    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels
            .read()
            .await
            .get(&topic)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Topics opened so far, sorted by name.
    pub async fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.channels.read().await.keys().copied().collect();
        topics.sort_by_key(|t| t.0);
        topics
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("buffer", &self.buffer)
            .field("publish_timeout", &self.publish_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_subscribers_of_the_topic() {
        let before = Utc::now().timestamp_millis();
        let bus: EventBus<String> = EventBus::default();
        let mut rx = bus.subscribe(Topic("tasks")).await;

        let delivered = bus.publish(Topic("tasks"), "created".to_string()).await;
        assert_eq!(delivered, 1);

        let evt = rx.recv().await.unwrap();
        assert_eq!(evt.topic, Topic("tasks"));
        assert_eq!(evt.payload, "created");
        assert!((before..=Utc::now().timestamp_millis()).contains(&evt.ts_ms));
    }

    #[tokio::test]
    async fn publish_without_subscribers_delivers_nothing() {
        let bus: EventBus<u64> = EventBus::default();
        assert_eq!(bus.publish(Topic("quiet"), 42).await, 0);
        assert_eq!(bus.subscriber_count(Topic("quiet")).await, 0);
        assert_eq!(bus.topics().await, vec![Topic("quiet")]);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus: EventBus<u64> = EventBus::new(8, Duration::from_millis(100));
        let mut rx_a = bus.subscribe(Topic("a")).await;
        let mut rx_b = bus.subscribe(Topic("b")).await;

        bus.publish(Topic("a"), 1).await;
        assert_eq!(rx_a.recv().await.unwrap().payload, 1);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn clones_share_topics() {
        let bus: EventBus<&'static str> = EventBus::default();
        let other = bus.clone();
        let mut rx = bus.subscribe(Topic("links")).await;

        assert_eq!(other.subscriber_count(Topic("links")).await, 1);
        other.publish(Topic("links"), "added").await;
        assert_eq!(rx.recv().await.unwrap().payload, "added");
    }
}

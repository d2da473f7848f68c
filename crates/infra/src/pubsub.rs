//! Broadcast-channel cache invalidator
//!
//! In-process equivalent of the deployment's pub/sub channel: every
//! subscriber receives every message published after it subscribed.
//! Instances sharing one `BroadcastInvalidator` (via `Arc`) model nodes
//! sharing one channel.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use featuregate_core::{CacheInvalidator, InvalidationCallback};
use featuregate_domain::{CacheUpdateMessage, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 256;

/// Invalidation channel backed by `tokio::sync::broadcast`
pub struct BroadcastInvalidator {
    channel: String,
    sender: broadcast::Sender<CacheUpdateMessage>,
    closed: AtomicBool,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
}

impl BroadcastInvalidator {
    /// Create an invalidator for a named channel.
    pub fn new(channel: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            channel: channel.into(),
            sender,
            closed: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Channel name this invalidator publishes on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Number of live subscriber tasks.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl CacheInvalidator for BroadcastInvalidator {
    async fn publish(&self, message: &CacheUpdateMessage) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        // A send error only means nobody is subscribed, which is fine.
        match self.sender.send(message.clone()) {
            Ok(receivers) => {
                debug!(channel = %self.channel, action = ?message.action, receivers, "invalidation published");
            }
            Err(_) => {
                debug!(channel = %self.channel, "invalidation published with no subscribers");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, callback: InvalidationCallback) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut receiver = self.sender.subscribe();
        let channel = self.channel.clone();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => callback(message),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Skipped deletes are safe: the short L1 TTL
                        // bounds any staleness they would have cleared.
                        warn!(channel = %channel, skipped, "invalidation subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.subscriptions.lock().push(handle);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for handle in self.subscriptions.lock().drain(..) {
            handle.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for pubsub.
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    async fn wait_for(predicate: impl Fn() -> bool) {
        for _ in 0..100 {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    /// Tests that every subscriber receives a published message.
    #[tokio::test]
    async fn test_fan_out() {
        let invalidator = BroadcastInvalidator::new("feature_flag:updates");
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        invalidator
            .subscribe(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .await
            .unwrap();
        let counter = second.clone();
        invalidator
            .subscribe(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .await
            .unwrap();

        invalidator.publish(&CacheUpdateMessage::updated("hero-banner")).await.unwrap();

        wait_for(|| first.load(Ordering::SeqCst) == 1 && second.load(Ordering::SeqCst) == 1).await;
    }

    /// Tests that messages carry their payload through the channel.
    #[tokio::test]
    async fn test_message_payload() {
        let invalidator = BroadcastInvalidator::new("feature_flag:updates");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        invalidator
            .subscribe(Box::new(move |message| {
                sink.lock().push(message);
            }))
            .await
            .unwrap();

        invalidator.publish(&CacheUpdateMessage::deleted("legacy")).await.unwrap();

        wait_for(|| !seen.lock().is_empty()).await;
        let messages = seen.lock();
        assert_eq!(messages[0].flag_key.as_deref(), Some("legacy"));
    }

    /// Tests that publishing without subscribers succeeds.
    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let invalidator = BroadcastInvalidator::new("feature_flag:updates");
        invalidator.publish(&CacheUpdateMessage::invalidate_all()).await.unwrap();
    }

    /// Tests that close stops delivery and is idempotent.
    #[tokio::test]
    async fn test_close() {
        let invalidator = BroadcastInvalidator::new("feature_flag:updates");
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        invalidator
            .subscribe(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .await
            .unwrap();

        invalidator.close().await.unwrap();
        invalidator.close().await.unwrap();

        invalidator.publish(&CacheUpdateMessage::updated("x")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}

//! Bounded inbound queue between the socket task and the consumer.
//!
//! The socket task pushes, one consumer pops. When the queue is full the
//! configured [`OverflowPolicy`] decides which message is lost; every drop
//! is counted and logged.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::messages::InboundMessage;

/// Default number of buffered inbound messages.
pub const DEFAULT_CAPACITY: usize = 64;

/// What to discard when a push finds the queue full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest buffered message. The newest always survives.
    #[default]
    DropOldest,
    /// Reject the incoming message and keep the backlog.
    DropNewest,
}

impl OverflowPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DropOldest => "drop_oldest",
            Self::DropNewest => "drop_newest",
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop_oldest" => Ok(Self::DropOldest),
            "drop_newest" => Ok(Self::DropNewest),
            other => Err(format!("unknown overflow policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub policy: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: OverflowPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct InboundQueue {
    items: Mutex<VecDeque<InboundMessage>>,
    config: QueueConfig,
    dropped: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl InboundQueue {
    /// A capacity of zero is raised to one.
    pub fn new(config: QueueConfig) -> Self {
        let config = QueueConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        Self {
            items: Mutex::new(VecDeque::with_capacity(config.capacity)),
            config,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Enqueue a message. Returns `false` when a message was lost to
    /// overflow (either the incoming one or the evicted oldest).
    pub fn push(&self, message: InboundMessage) -> bool {
        let mut items = self.lock();
        let mut kept_all = true;

        if items.len() >= self.config.capacity {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            kept_all = false;
            match self.config.policy {
                OverflowPolicy::DropOldest => {
                    if let Some(evicted) = items.pop_front() {
                        tracing::warn!(
                            kind = %evicted.kind,
                            capacity = self.config.capacity,
                            "Inbound queue full, dropped oldest message",
                        );
                    }
                }
                OverflowPolicy::DropNewest => {
                    tracing::warn!(
                        kind = %message.kind,
                        capacity = self.config.capacity,
                        "Inbound queue full, dropped incoming message",
                    );
                    return false;
                }
            }
        }

        items.push_back(message);
        drop(items);
        self.notify.notify_one();
        kept_all
    }

    pub fn try_pop(&self) -> Option<InboundMessage> {
        self.lock().pop_front()
    }

    /// Wait for the next message. Returns `None` once the queue is closed
    /// and empty.
    pub async fn pop(&self) -> Option<InboundMessage> {
        loop {
            let notified = self.notify.notified();
            if let Some(message) = self.try_pop() {
                return Some(message);
            }
            if self.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// Take everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<InboundMessage> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Total number of messages lost to overflow.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Mark the producer side finished. Buffered messages stay readable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        // Also wake a consumer that has not yet registered as a waiter.
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, VecDeque<InboundMessage>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn msg(kind: &str) -> InboundMessage {
        InboundMessage::new(kind, serde_json::Value::Null)
    }

    fn kinds(messages: Vec<InboundMessage>) -> Vec<String> {
        messages.into_iter().map(|m| m.kind).collect()
    }

    #[test]
    fn policy_parses_from_env_strings() {
        assert_eq!("drop_oldest".parse(), Ok(OverflowPolicy::DropOldest));
        assert_eq!(" DROP_NEWEST ".parse(), Ok(OverflowPolicy::DropNewest));
        assert!("block".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn drop_oldest_keeps_latest() {
        let queue = InboundQueue::new(QueueConfig {
            capacity: 2,
            policy: OverflowPolicy::DropOldest,
        });
        assert!(queue.push(msg("a")));
        assert!(queue.push(msg("b")));
        assert!(!queue.push(msg("c")));

        assert_eq!(queue.dropped(), 1);
        assert_eq!(kinds(queue.drain()), vec!["b", "c"]);
    }

    #[test]
    fn drop_newest_keeps_backlog() {
        let queue = InboundQueue::new(QueueConfig {
            capacity: 2,
            policy: OverflowPolicy::DropNewest,
        });
        queue.push(msg("a"));
        queue.push(msg("b"));
        assert!(!queue.push(msg("c")));
        assert!(!queue.push(msg("d")));

        assert_eq!(queue.dropped(), 2);
        assert_eq!(kinds(queue.drain()), vec!["a", "b"]);
    }

    #[test]
    fn capacity_one_behaves_like_latest_slot() {
        let queue = InboundQueue::new(QueueConfig {
            capacity: 0,
            policy: OverflowPolicy::DropOldest,
        });
        assert_eq!(queue.config().capacity, 1);
        queue.push(msg("first"));
        queue.push(msg("second"));
        assert_eq!(queue.try_pop().unwrap().kind, "second");
        assert!(queue.try_pop().is_none());
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = Arc::new(InboundQueue::new(QueueConfig::default()));
        let producer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(msg("late"));
        });

        let got = tokio::time::timeout(Duration::from_secs(2), queue.pop())
            .await
            .unwrap();
        assert_eq!(got.unwrap().kind, "late");
    }

    #[tokio::test]
    async fn pop_drains_then_ends_after_close() {
        let queue = InboundQueue::new(QueueConfig::default());
        queue.push(msg("x"));
        queue.close();

        assert_eq!(queue.pop().await.unwrap().kind, "x");
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn close_wakes_waiting_consumer() {
        let queue = Arc::new(InboundQueue::new(QueueConfig::default()));
        let closer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });

        let got = tokio::time::timeout(Duration::from_secs(2), queue.pop())
            .await
            .unwrap();
        assert!(got.is_none());
    }
}

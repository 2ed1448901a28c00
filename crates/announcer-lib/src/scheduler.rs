//! Pending-message scheduling: queue or latest-wins dispatch with a bounded backlog.

use std::collections::VecDeque;
use std::time::Instant;

use tokio::sync::{Mutex, Notify};

use announcer_core::types::DispatchPolicy;

/// A unit of text awaiting synthesis.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub arrived_at: Instant,
}

/// Holds messages awaiting synthesis, enforcing dispatch policy and the backlog bound.
///
/// Backed by a mutex rather than a channel: eviction needs ordered inspection
/// of the backlog (front-eviction in `queue` mode, drain-all in `latest-wins`),
/// which a plain mpsc channel can't express.
pub struct PendingBuffer {
    inner: Mutex<VecDeque<Message>>,
    notify: Notify,
    policy: DispatchPolicy,
    max_queue: usize,
}

impl PendingBuffer {
    pub fn new(policy: DispatchPolicy, max_queue: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            policy,
            max_queue: max_queue.max(1),
        }
    }

    /// Insert a message, applying dispatch policy and the backlog bound.
    ///
    /// Returns messages evicted to make room — each warrants one drop-tone
    /// playback by the caller.
    pub async fn push(&self, msg: Message) -> Vec<Message> {
        let mut evicted = Vec::new();
        {
            let mut guard = self.inner.lock().await;
            match self.policy {
                DispatchPolicy::LatestWins => {
                    evicted.extend(guard.drain(..));
                    guard.push_back(msg);
                }
                DispatchPolicy::Queue => {
                    guard.push_back(msg);
                    while guard.len() > self.max_queue {
                        if let Some(old) = guard.pop_front() {
                            evicted.push(old);
                        }
                    }
                }
            }
        }
        self.notify.notify_one();
        evicted
    }

    /// Wait until at least one message is pending.
    pub async fn wait_non_empty(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.inner.lock().await.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Remove and return the next message to synthesize, according to dispatch policy.
    pub async fn pop(&self) -> Option<Message> {
        self.inner.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: u64, text: &str) -> Message {
        Message {
            id,
            text: text.to_string(),
            arrived_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn queue_mode_is_fifo() {
        let buf = PendingBuffer::new(DispatchPolicy::Queue, 10);
        buf.push(msg(1, "a")).await;
        buf.push(msg(2, "b")).await;
        assert_eq!(buf.pop().await.unwrap().id, 1);
        assert_eq!(buf.pop().await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn queue_mode_evicts_front_on_overflow() {
        let buf = PendingBuffer::new(DispatchPolicy::Queue, 2);
        buf.push(msg(1, "a")).await;
        buf.push(msg(2, "b")).await;
        let evicted = buf.push(msg(3, "c")).await;
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, 1);
        assert_eq!(buf.len().await, 2);
        assert_eq!(buf.pop().await.unwrap().id, 2);
        assert_eq!(buf.pop().await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn latest_wins_keeps_only_newest() {
        let buf = PendingBuffer::new(DispatchPolicy::LatestWins, 10);
        buf.push(msg(1, "a")).await;
        buf.push(msg(2, "b")).await;
        let evicted = buf.push(msg(3, "c")).await;
        assert_eq!(evicted.len(), 2);
        assert_eq!(buf.len().await, 1);
        assert_eq!(buf.pop().await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn wait_non_empty_returns_immediately_when_populated() {
        let buf = PendingBuffer::new(DispatchPolicy::Queue, 10);
        buf.push(msg(1, "a")).await;
        tokio::time::timeout(std::time::Duration::from_millis(50), buf.wait_non_empty())
            .await
            .expect("should not block");
    }

    #[tokio::test]
    async fn wait_non_empty_wakes_on_push() {
        let buf = std::sync::Arc::new(PendingBuffer::new(DispatchPolicy::Queue, 10));
        let waiter = {
            let buf = buf.clone();
            tokio::spawn(async move {
                buf.wait_non_empty().await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        buf.push(msg(1, "a")).await;
        tokio::time::timeout(std::time::Duration::from_millis(100), waiter)
            .await
            .expect("waiter should complete")
            .unwrap();
    }
}

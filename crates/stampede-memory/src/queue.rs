use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use stampede_core::{IntentQueue, OrderIntent, QueueMessage, Result};
use tokio::sync::Notify;
use tokio::time::timeout;

#[derive(Debug, Default)]
struct QueueInner {
    next_seq: u64,
    /// Enqueued, not yet delivered to the consumer.
    backlog: VecDeque<QueueMessage>,
    /// Delivered, not yet acknowledged — the recoverable pending list.
    pending: Vec<QueueMessage>,
}

/// In-memory intent queue with consumer-group visibility semantics:
/// delivered messages stay on a pending list until acknowledged, and the
/// pending list is re-readable oldest-first for crash recovery.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous enqueue, shared with [`crate::MemoryInventoryGate`] so the
    /// gate can append within its own critical section.
    pub(crate) fn push(&self, intent: OrderIntent) {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        let id = format!("{}-0", inner.next_seq);
        inner.next_seq += 1;
        inner.backlog.push_back(QueueMessage { id, intent });
        drop(inner);
        self.notify.notify_one();
    }

    fn pop_new(&self) -> Option<QueueMessage> {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        let message = inner.backlog.pop_front()?;
        inner.pending.push(message.clone());
        Some(message)
    }

    /// Number of delivered-unacknowledged messages; test helper.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().expect("queue mutex poisoned").pending.len()
    }
}

#[async_trait]
impl IntentQueue for MemoryQueue {
    async fn ensure_group(&self) -> Result<()> {
        // The single in-process group always exists.
        Ok(())
    }

    async fn enqueue(&self, intent: &OrderIntent) -> Result<()> {
        self.push(*intent);
        Ok(())
    }

    async fn read_new(&self, block: Duration) -> Result<Option<QueueMessage>> {
        let deadline = Instant::now() + block;
        loop {
            // Register for a wakeup before checking, so an enqueue racing
            // between the check and the wait is not missed.
            let notified = self.notify.notified();
            if let Some(message) = self.pop_new() {
                return Ok(Some(message));
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Ok(None);
            };
            if timeout(remaining, notified).await.is_err() {
                return Ok(self.pop_new());
            }
        }
    }

    async fn read_pending(&self) -> Result<Option<QueueMessage>> {
        let inner = self.inner.lock().expect("queue mutex poisoned");
        Ok(inner.pending.first().cloned())
    }

    async fn ack(&self, message_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        inner.pending.retain(|m| m.id != message_id);
        Ok(())
    }
}

use std::sync::Arc;

use stampede_core::{
    CoreError, IntentQueue, LockManager, Order, OrderIntent, OrderStore, QueueMessage, Result,
};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::metrics;

/// Namespace for per-user order locks.
const ORDER_LOCK_PREFIX: &str = "lock:order:";

/// The single background consumer that turns admitted intents into durable
/// orders.
///
/// Per-message state machine: `Delivered → Processing → Acknowledged`, with
/// redelivery through the pending backlog after a crash or failure. Because
/// materialization re-checks `(user, sku)` uniqueness under the per-user
/// lock, redelivery is idempotent and at-least-once delivery yields
/// exactly-once application.
///
/// # Example
///
/// ```ignore
/// let pipeline = Arc::new(OrderPipeline::new(queue, locks, store, PipelineConfig::default()));
/// tokio::spawn(pipeline.run());
/// ```
pub struct OrderPipeline {
    queue: Arc<dyn IntentQueue>,
    locks: Arc<dyn LockManager>,
    store: Arc<dyn OrderStore>,
    config: PipelineConfig,
}

impl OrderPipeline {
    pub fn new(
        queue: Arc<dyn IntentQueue>,
        locks: Arc<dyn LockManager>,
        store: Arc<dyn OrderStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            queue,
            locks,
            store,
            config,
        }
    }

    /// Run the consumer until the task is aborted.
    ///
    /// Any processing failure switches to the pending-backlog recovery loop
    /// before new messages are read again, so a failed message is never
    /// overtaken and lost.
    pub async fn run(self: Arc<Self>) {
        info!("starting order pipeline consumer");
        self.ensure_group_with_retry().await;

        loop {
            match self.poll_once().await {
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "order processing failed, draining pending backlog");
                    metrics::record_retry();
                    self.drain_pending().await;
                }
            }
        }
    }

    /// Read and process at most one new message, blocking up to the
    /// configured bound when the queue is empty. Returns whether a message
    /// was processed.
    pub async fn poll_once(&self) -> Result<bool> {
        let Some(message) = self.queue.read_new(self.config.block()).await? else {
            return Ok(false);
        };
        self.handle(message).await?;
        Ok(true)
    }

    /// Recovery loop: re-read this consumer's unacknowledged backlog from
    /// the start until it is empty. Failures back off and retry the same
    /// backlog — a message is never skipped because of a transient error.
    /// Terminates only on an empty backlog; a message that keeps failing
    /// blocks the drain on purpose (backpressure, visible in logs).
    pub async fn drain_pending(&self) {
        loop {
            match self.queue.read_pending().await {
                Ok(None) => {
                    debug!("pending backlog drained");
                    return;
                }
                Ok(Some(message)) => {
                    if let Err(e) = self.handle(message).await {
                        if e.is_transient() {
                            warn!(error = %e, "pending message failed, backing off");
                        } else {
                            error!(
                                error = %e,
                                "pending message failed with a non-retryable error, backlog blocked"
                            );
                        }
                        metrics::record_retry();
                        sleep(self.config.retry_backoff()).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "pending backlog read failed, backing off");
                    sleep(self.config.retry_backoff()).await;
                }
            }
        }
    }

    /// Process one delivered message: per-user lock, materialize,
    /// acknowledge. The message is only acknowledged after materialization
    /// succeeded; on any earlier exit it stays pending for recovery.
    async fn handle(&self, message: QueueMessage) -> Result<()> {
        let intent = message.intent;
        let lock_name = format!("{ORDER_LOCK_PREFIX}{}", intent.user_id);

        let Some(token) = self.locks.try_lock(&lock_name, self.config.lock_ttl()).await? else {
            // Another worker is materializing for this user right now; the
            // unacknowledged message will come back through the pending
            // backlog.
            warn!(
                user_id = intent.user_id,
                order_id = intent.order_id,
                "order lock contended, deferring message"
            );
            metrics::record_lock_deferral();
            return Err(CoreError::LockContended { name: lock_name });
        };

        let result = self.materialize(&intent).await;
        match self.locks.unlock(&lock_name, &token).await {
            Ok(true) => {}
            Ok(false) => warn!(
                lock = %lock_name,
                "order lock TTL elapsed during materialization"
            ),
            Err(e) => warn!(lock = %lock_name, error = %e, "failed to release order lock"),
        }
        result?;

        self.queue.ack(&message.id).await
    }

    /// Create the order against the source of truth, guarded by redundant
    /// checks so redelivery and fast-path/source-of-truth drift are both
    /// harmless.
    async fn materialize(&self, intent: &OrderIntent) -> Result<()> {
        // Uniqueness re-check: an earlier delivery may have materialized
        // this intent already.
        if self.store.count_orders(intent.user_id, intent.sku_id).await? > 0 {
            info!(
                user_id = intent.user_id,
                sku_id = intent.sku_id,
                order_id = intent.order_id,
                "order already exists, skipping redelivery"
            );
            return Ok(());
        }

        // Conditioned decrement in the source of truth, guarding the rare
        // case where the fast-path counter and the database disagree.
        if !self.store.decrement_stock_if_positive(intent.sku_id).await? {
            warn!(
                sku_id = intent.sku_id,
                order_id = intent.order_id,
                "source-of-truth stock exhausted, dropping intent"
            );
            return Ok(());
        }

        let order = Order::from_intent(intent);
        self.store.persist_order(&order).await?;
        metrics::record_materialized();
        info!(order_id = order.id, user_id = order.user_id, "order materialized");
        Ok(())
    }

    async fn ensure_group_with_retry(&self) {
        loop {
            match self.queue.ensure_group().await {
                Ok(()) => return,
                Err(e) => {
                    error!(error = %e, "failed to create consumer group, retrying");
                    sleep(self.config.retry_backoff()).await;
                }
            }
        }
    }
}

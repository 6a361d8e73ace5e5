use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use stampede_core::{CoreError, IntentQueue, OrderIntent, QueueMessage, Result};

use crate::config::StreamConfig;

/// Redis Streams consumer group behind the [`IntentQueue`] trait.
///
/// `read_new` is `XREADGROUP … COUNT 1 BLOCK n STREAMS stream >`;
/// `read_pending` re-reads this consumer's unacknowledged backlog from
/// offset `0`, which is what makes crash recovery possible.
pub struct RedisIntentQueue {
    pool: Pool,
    streams: StreamConfig,
}

impl RedisIntentQueue {
    pub fn new(pool: Pool, streams: &StreamConfig) -> Self {
        Self {
            pool,
            streams: streams.clone(),
        }
    }

    fn first_message(reply: Option<StreamReadReply>) -> Result<Option<QueueMessage>> {
        let Some(entry) = reply
            .into_iter()
            .flat_map(|r| r.keys)
            .flat_map(|k| k.ids)
            .next()
        else {
            return Ok(None);
        };

        let intent = OrderIntent {
            order_id: field_u64(&entry, "id")?,
            user_id: field_u64(&entry, "user_id")?,
            sku_id: field_u64(&entry, "sku_id")?,
        };
        Ok(Some(QueueMessage {
            id: entry.id,
            intent,
        }))
    }
}

fn field_u64(entry: &StreamId, field: &str) -> Result<u64> {
    let value = entry.map.get(field).ok_or_else(|| {
        CoreError::backend(format!("intent message {} missing field {field}", entry.id))
    })?;
    let text = redis::from_redis_value::<String>(value).map_err(CoreError::backend)?;
    text.parse()
        .map_err(|_| CoreError::backend(format!("intent field {field} is not an integer: {text}")))
}

#[async_trait]
impl IntentQueue for RedisIntentQueue {
    async fn ensure_group(&self) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        let created = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.streams.stream)
            .arg(&self.streams.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async::<String>(&mut conn)
            .await;
        match created {
            Ok(_) => {
                tracing::info!(
                    stream = %self.streams.stream,
                    group = %self.streams.group,
                    "consumer group created"
                );
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {
                tracing::debug!(
                    stream = %self.streams.stream,
                    group = %self.streams.group,
                    "consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(CoreError::backend(e)),
        }
    }

    async fn enqueue(&self, intent: &OrderIntent) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        conn.xadd::<_, _, _, _, String>(
            &self.streams.stream,
            "*",
            &[
                ("id", intent.order_id.to_string()),
                ("user_id", intent.user_id.to_string()),
                ("sku_id", intent.sku_id.to_string()),
            ],
        )
        .await
        .map_err(CoreError::backend)?;
        Ok(())
    }

    async fn read_new(&self, block: Duration) -> Result<Option<QueueMessage>> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        let options = StreamReadOptions::default()
            .group(&self.streams.group, &self.streams.consumer)
            .count(1)
            .block(block.as_millis() as usize);
        let reply = conn
            .xread_options::<_, _, Option<StreamReadReply>>(
                &[&self.streams.stream],
                &[">"],
                &options,
            )
            .await
            .map_err(CoreError::backend)?;
        Self::first_message(reply)
    }

    async fn read_pending(&self) -> Result<Option<QueueMessage>> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        let options = StreamReadOptions::default()
            .group(&self.streams.group, &self.streams.consumer)
            .count(1);
        let reply = conn
            .xread_options::<_, _, Option<StreamReadReply>>(
                &[&self.streams.stream],
                &["0"],
                &options,
            )
            .await
            .map_err(CoreError::backend)?;
        Self::first_message(reply)
    }

    async fn ack(&self, message_id: &str) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        conn.xack::<_, _, _, i64>(&self.streams.stream, &self.streams.group, &[message_id])
            .await
            .map_err(CoreError::backend)?;
        Ok(())
    }
}

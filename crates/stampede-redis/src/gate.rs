use std::sync::LazyLock;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::{AsyncCommands, Script};
use stampede_core::{Admission, CoreError, InventoryGate, Result};

use crate::config::StreamConfig;

static ADMIT_SCRIPT: LazyLock<Script> =
    LazyLock::new(|| Script::new(include_str!("../scripts/admit.lua")));

/// Fast-path stock counter keys, also hardcoded in `admit.lua`.
pub const STOCK_KEY_PREFIX: &str = "seckill:stock:";

/// Atomic admission over the Redis scripting facility.
///
/// The script checks stock, checks the per-sku buyer set, and on success
/// decrements, records the buyer and appends the order intent to the
/// stream — all in one evaluation, so no interleaving request can observe
/// a partially-applied state.
pub struct RedisInventoryGate {
    pool: Pool,
    stream: String,
}

impl RedisInventoryGate {
    pub fn new(pool: Pool, streams: &StreamConfig) -> Self {
        Self {
            pool,
            stream: streams.stream.clone(),
        }
    }
}

#[async_trait]
impl InventoryGate for RedisInventoryGate {
    async fn admit(&self, sku_id: u64, user_id: u64, order_id: u64) -> Result<Admission> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        let code = ADMIT_SCRIPT
            .key(&self.stream)
            .arg(sku_id)
            .arg(user_id)
            .arg(order_id)
            .invoke_async::<i64>(&mut conn)
            .await
            .map_err(CoreError::backend)?;

        match code {
            0 => Ok(Admission::Admitted { order_id }),
            1 => Ok(Admission::NoStock),
            2 => Ok(Admission::DuplicatePurchase),
            other => Err(CoreError::backend(format!(
                "unexpected admission code {other}"
            ))),
        }
    }

    async fn seed_stock(&self, sku_id: u64, stock: i64) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(CoreError::backend)?;
        conn.set::<_, _, ()>(format!("{STOCK_KEY_PREFIX}{sku_id}"), stock)
            .await
            .map_err(CoreError::backend)
    }
}

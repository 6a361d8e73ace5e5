use std::sync::Arc;

use stampede_core::{Admission, InventoryGate, Result, TimestampIdGenerator};

use crate::metrics;

/// Business key for order ids.
const ORDER_ID_KEY: &str = "order";

/// Synchronous half of the flash sale: admission control.
///
/// `place_order` answers in one round trip to the fast store. A successful
/// response means the attempt is admitted and queued; the durable order is
/// created asynchronously by [`crate::OrderPipeline`].
pub struct SeckillService {
    ids: Arc<TimestampIdGenerator>,
    gate: Arc<dyn InventoryGate>,
}

impl SeckillService {
    pub fn new(ids: Arc<TimestampIdGenerator>, gate: Arc<dyn InventoryGate>) -> Self {
        Self { ids, gate }
    }

    /// Attempt a purchase. The order id is generated up front so an admitted
    /// caller can be answered with it before the order exists in the source
    /// of truth.
    ///
    /// `NoStock` and `DuplicatePurchase` are terminal; callers must not
    /// retry them.
    pub async fn place_order(&self, sku_id: u64, user_id: u64) -> Result<Admission> {
        let order_id = self.ids.next_id(ORDER_ID_KEY).await?;
        let admission = self.gate.admit(sku_id, user_id, order_id).await?;

        match admission {
            Admission::Admitted { order_id } => {
                tracing::debug!(sku_id, user_id, order_id, "purchase admitted");
                metrics::record_admission("admitted");
            }
            Admission::NoStock => {
                tracing::debug!(sku_id, user_id, "admission refused: no stock");
                metrics::record_admission("no_stock");
            }
            Admission::DuplicatePurchase => {
                tracing::debug!(sku_id, user_id, "admission refused: duplicate purchase");
                metrics::record_admission("duplicate");
            }
        }

        Ok(admission)
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use stampede_core::{CoreError, Order, OrderStore, Result};

#[derive(Debug, Default)]
struct StoreInner {
    orders: Vec<Order>,
    stock: HashMap<u64, i64>,
}

/// In-memory source of truth for orders and inventory.
///
/// A materialization step's conditional mutations each run under one mutex,
/// and `persist_order` enforces the `(user_id, sku_id)` uniqueness invariant
/// the way a database unique index would.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    inner: Mutex<StoreInner>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed source-of-truth stock for a sku.
    pub fn seed_stock(&self, sku_id: u64, stock: i64) {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .stock
            .insert(sku_id, stock);
    }

    /// Snapshot of all persisted orders; test helper.
    pub fn orders(&self) -> Vec<Order> {
        self.inner.lock().expect("store mutex poisoned").orders.clone()
    }

    /// Remaining source-of-truth stock for a sku; test helper.
    pub fn stock(&self, sku_id: u64) -> i64 {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .stock
            .get(&sku_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn count_orders(&self, user_id: u64, sku_id: u64) -> Result<u64> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .orders
            .iter()
            .filter(|o| o.user_id == user_id && o.sku_id == sku_id)
            .count() as u64)
    }

    async fn decrement_stock_if_positive(&self, sku_id: u64) -> Result<bool> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.stock.get_mut(&sku_id) {
            Some(stock) if *stock > 0 => {
                *stock -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn persist_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner
            .orders
            .iter()
            .any(|o| o.user_id == order.user_id && o.sku_id == order.sku_id)
        {
            return Err(CoreError::backend(format!(
                "unique constraint violated for (user {}, sku {})",
                order.user_id, order.sku_id
            )));
        }
        inner.orders.push(order.clone());
        Ok(())
    }
}

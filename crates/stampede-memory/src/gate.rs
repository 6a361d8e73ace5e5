use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stampede_core::{Admission, InventoryGate, OrderIntent, Result};

use crate::MemoryQueue;

#[derive(Debug, Default)]
struct GateState {
    stock: HashMap<u64, i64>,
    buyers: HashMap<u64, HashSet<u64>>,
}

/// In-memory admission gate.
///
/// All three admission effects — stock decrement, buyer record, enqueue —
/// happen while the gate mutex is held, giving the same all-or-nothing
/// visibility as the Redis admission script.
pub struct MemoryInventoryGate {
    state: Mutex<GateState>,
    queue: Arc<MemoryQueue>,
}

impl MemoryInventoryGate {
    pub fn new(queue: Arc<MemoryQueue>) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            queue,
        }
    }

    /// Remaining fast-path stock for a sku; test helper.
    pub fn stock(&self, sku_id: u64) -> i64 {
        self.state
            .lock()
            .expect("gate mutex poisoned")
            .stock
            .get(&sku_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl InventoryGate for MemoryInventoryGate {
    async fn admit(&self, sku_id: u64, user_id: u64, order_id: u64) -> Result<Admission> {
        let mut state = self.state.lock().expect("gate mutex poisoned");

        if state.stock.get(&sku_id).copied().unwrap_or(0) < 1 {
            return Ok(Admission::NoStock);
        }
        if state
            .buyers
            .get(&sku_id)
            .is_some_and(|buyers| buyers.contains(&user_id))
        {
            return Ok(Admission::DuplicatePurchase);
        }

        *state.stock.entry(sku_id).or_insert(0) -= 1;
        state.buyers.entry(sku_id).or_default().insert(user_id);
        self.queue.push(OrderIntent {
            order_id,
            user_id,
            sku_id,
        });

        Ok(Admission::Admitted { order_id })
    }

    async fn seed_stock(&self, sku_id: u64, stock: i64) -> Result<()> {
        self.state
            .lock()
            .expect("gate mutex poisoned")
            .stock
            .insert(sku_id, stock);
        Ok(())
    }
}

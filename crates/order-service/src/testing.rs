//! 测试辅助：内存订单仓储

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::models::{NewOrder, Order};
use crate::repository::OrderRepositoryTrait;

#[derive(Debug)]
pub struct InMemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
    next_id: AtomicI64,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有订单的快照
    pub fn all(&self) -> Vec<Order> {
        self.orders.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl OrderRepositoryTrait for InMemoryOrderRepository {
    async fn create(&self, order: &NewOrder) -> Result<Order> {
        let now = Utc::now();
        let created = Order {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: order.status,
            created_at: now,
            updated_at: now,
        };
        self.orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(created.clone());
        Ok(created)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .all()
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}

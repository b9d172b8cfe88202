//! 订单仓储与消费幂等记录
//!
//! `processed_events` 表与订单表同属本服务，幂等记录的 PostgreSQL 实现也放在这里。

use async_trait::async_trait;
use cloudnative_shared::error::Result as PlatformResult;
use cloudnative_shared::idempotency::IdempotencyStore;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{NewOrder, Order};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    async fn create(&self, order: &NewOrder) -> Result<Order>;

    /// 按 ID 升序返回用户的全部订单
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>>;
}

/// 基于 PostgreSQL 的订单仓储
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepositoryTrait for PgOrderRepository {
    async fn create(&self, order: &NewOrder) -> Result<Order> {
        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id, total_amount, status)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, total_amount, status, created_at, updated_at
            "#,
        )
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(order.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, total_amount, status, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

/// 基于 processed_events 表的幂等记录
///
/// 重启后仍能识别已处理的事件。
pub struct PgIdempotencyStore {
    pool: PgPool,
}

impl PgIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyStore for PgIdempotencyStore {
    async fn is_processed(&self, consumer: &str, event_id: &str) -> PlatformResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM processed_events WHERE consumer = $1 AND event_id = $2
            )
            "#,
        )
        .bind(consumer)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn mark_processed(&self, consumer: &str, event_id: &str) -> PlatformResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (consumer, event_id)
            VALUES ($1, $2)
            ON CONFLICT (consumer, event_id) DO NOTHING
            "#,
        )
        .bind(consumer)
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, consumer: &str, event_id: &str) -> PlatformResult<()> {
        sqlx::query("DELETE FROM processed_events WHERE consumer = $1 AND event_id = $2")
            .bind(consumer)
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

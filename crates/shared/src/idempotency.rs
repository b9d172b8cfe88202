//! 事件幂等记录
//!
//! Kafka 提供至少一次投递，同一事件可能被重复消费，重投也可能与首次处理并发。
//! 消费方在产生副作用之前先调用 `mark_processed` 认领 `(consumer, event_id)`，
//! 返回 `false` 说明已被认领，直接跳过；副作用失败时用 `release` 撤销认领，
//! 让重投的事件可以再次处理。
//!
//! 本模块定义存储抽象和进程内实现；需要跨重启保留记录的服务
//! （如订单服务）自行提供基于数据库的实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::PlatformError;

/// 幂等记录存储
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// 事件是否已被该消费者处理过
    async fn is_processed(&self, consumer: &str, event_id: &str) -> Result<bool, PlatformError>;

    /// 原子地标记事件已处理，返回是否为首次标记
    async fn mark_processed(&self, consumer: &str, event_id: &str) -> Result<bool, PlatformError>;

    /// 撤销标记
    async fn release(&self, consumer: &str, event_id: &str) -> Result<(), PlatformError>;
}

/// 进程内幂等记录
///
/// 基于 DashMap，记录只在进程生命周期内有效，重启后重复事件会再次被处理。
#[derive(Debug, Default)]
pub struct MemoryIdempotencyStore {
    processed: DashMap<String, DateTime<Utc>>,
}

impl MemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(consumer: &str, event_id: &str) -> String {
        format!("{consumer}:{event_id}")
    }

    /// 已记录的事件数量
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn is_processed(&self, consumer: &str, event_id: &str) -> Result<bool, PlatformError> {
        Ok(self.processed.contains_key(&Self::key(consumer, event_id)))
    }

    async fn mark_processed(&self, consumer: &str, event_id: &str) -> Result<bool, PlatformError> {
        let previous = self
            .processed
            .insert(Self::key(consumer, event_id), Utc::now());
        Ok(previous.is_none())
    }

    async fn release(&self, consumer: &str, event_id: &str) -> Result<(), PlatformError> {
        self.processed.remove(&Self::key(consumer, event_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_then_check() {
        let store = MemoryIdempotencyStore::new();

        assert!(!store.is_processed("order-service", "evt-1").await.unwrap());
        assert!(store.mark_processed("order-service", "evt-1").await.unwrap());
        assert!(store.is_processed("order-service", "evt-1").await.unwrap());

        // 重复标记不算首次
        assert!(!store.mark_processed("order-service", "evt-1").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_release_allows_reclaim() {
        let store = MemoryIdempotencyStore::new();
        assert!(store.mark_processed("order-service", "evt-1").await.unwrap());

        store.release("order-service", "evt-1").await.unwrap();

        assert!(!store.is_processed("order-service", "evt-1").await.unwrap());
        assert!(store.mark_processed("order-service", "evt-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_consumers_are_isolated() {
        let store = MemoryIdempotencyStore::new();
        store.mark_processed("order-service", "evt-1").await.unwrap();

        assert!(!store.is_processed("notification-service", "evt-1").await.unwrap());
    }
}

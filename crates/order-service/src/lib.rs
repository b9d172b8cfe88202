//! 订单服务
//!
//! 消费 `user-events` 上的 `user.created` 事件，为每个新用户创建一笔占位订单，
//! 并向 `order-events` 发布 `order.processed`；同时提供按用户查询订单的 REST API。

pub mod consumer;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{OrderError, Result};
pub use models::{NewOrder, Order, OrderStatus};
pub use service::OrderService;

/// 订单服务自己的数据库迁移（orders、processed_events）
pub fn migrator() -> sqlx::migrate::Migrator {
    let mut migrator = sqlx::migrate!();
    migrator.set_ignore_missing(true);
    migrator
}

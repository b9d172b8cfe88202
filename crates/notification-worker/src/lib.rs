//! 通知服务
//!
//! 消费 `user.created` 与 `order.processed` 事件，渲染通知并通过发送器投递
//! （当前为日志模拟），随后向 `notification-events` 发布 `notification.sent`。

pub mod consumer;
pub mod error;
pub mod sender;
pub mod service;
pub mod templates;

pub use error::NotificationError;
pub use service::NotificationService;

//! 通知服务错误类型
//!
//! 定义通知发送、事件校验和消息反序列化等场景的错误分类，
//! 消费者据此区分重复、拒绝和失败三种结果。

use cloudnative_shared::error::PlatformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("通知发送失败: 渠道={channel}, 原因={reason}")]
    SendFailed { channel: String, reason: String },

    #[error("事件已处理: {event_id}")]
    AlreadyProcessed { event_id: String },

    #[error("不支持的事件类型: {event_type}")]
    UnsupportedEventType { event_type: String },

    #[error("未订阅的 topic: {0}")]
    UnknownTopic(String),

    #[error("事件发布失败: {0}")]
    EventPublish(PlatformError),

    #[error(transparent)]
    Shared(#[from] PlatformError),
}

impl NotificationError {
    /// 消费结果标签，用于 `events_consumed_total{outcome}`
    pub fn consume_outcome(&self) -> &'static str {
        match self {
            Self::AlreadyProcessed { .. } => "duplicate",
            Self::UnsupportedEventType { .. }
            | Self::UnknownTopic(_)
            | Self::Shared(PlatformError::Serialization(_)) => "rejected",
            _ => "failed",
        }
    }
}

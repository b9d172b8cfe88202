//! 订单服务错误类型
//!
//! 事件处理相关的变体只出现在消费路径上；HTTP 路径只会遇到参数和系统错误。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cloudnative_shared::error::PlatformError;
use cloudnative_shared::response::error_response;

/// 订单服务错误
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// Kafka 重复投递时通过 processed_events 识别出已处理的事件，直接跳过
    #[error("事件已处理: {event_id}")]
    AlreadyProcessed { event_id: String },

    /// 本服务只处理 `user.created`，收到其他类型说明路由配置有误
    #[error("不支持的事件类型: {event_type}")]
    UnsupportedEventType { event_type: String },

    /// 事件内容不合法（如 userId 不是数字）
    #[error("事件内容无效: {0}")]
    InvalidEvent(String),

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("事件发布失败: {0}")]
    EventPublish(PlatformError),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Shared(#[from] PlatformError),
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidEvent(_) | Self::UnsupportedEventType { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::AlreadyProcessed { .. } => StatusCode::CONFLICT,
            Self::EventPublish(_) | Self::Database(_) | Self::Shared(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyProcessed { .. } => "ALREADY_PROCESSED",
            Self::UnsupportedEventType { .. } => "UNSUPPORTED_EVENT_TYPE",
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::EventPublish(_) => "EVENT_PUBLISH_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Shared(e) => e.code(),
        }
    }

    /// 消费结果标签，用于 `events_consumed_total{outcome}`
    pub fn consume_outcome(&self) -> &'static str {
        match self {
            Self::AlreadyProcessed { .. } => "duplicate",
            Self::UnsupportedEventType { .. } | Self::InvalidEvent(_) => "rejected",
            Self::Shared(PlatformError::Serialization(_)) => "rejected",
            _ => "failed",
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.error_code(), &self)
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, OrderError>;

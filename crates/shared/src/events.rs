//! 领域事件模型
//!
//! 定义服务之间通过 Kafka 交换的三种事件：`user.created`、`order.processed`、
//! `notification.sent`。事件一经构造即不可变，序列化为 camelCase JSON。
//!
//! 每个事件都带有 `event_id`（UUID v7），消费方以此做幂等校验；
//! `event_type` 字段冗余保存事件类型字符串，便于消费方在反序列化后校验路由是否正确。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kafka::topics;

/// 事件类型字符串常量
pub mod event_types {
    pub const USER_CREATED: &str = "user.created";
    pub const ORDER_PROCESSED: &str = "order.processed";
    pub const NOTIFICATION_SENT: &str = "notification.sent";
}

/// 可发布到 Kafka 的领域事件
///
/// 发布方通过 `topic()` 和 `partition_key()` 决定消息落点，
/// 同一 key 的消息落在同一分区，保证单个用户的事件有序。
pub trait DomainEvent: Serialize + Send + Sync {
    /// 事件唯一标识，消费方的幂等键
    fn event_id(&self) -> &str;

    fn event_type(&self) -> &str;

    /// 事件所属 topic
    fn topic(&self) -> &'static str;

    /// Kafka 消息 key
    fn partition_key(&self) -> &str;
}

fn new_event_id() -> String {
    Uuid::now_v7().to_string()
}

// ---------------------------------------------------------------------------
// UserCreatedEvent
// ---------------------------------------------------------------------------

/// 用户创建事件
///
/// 由用户服务在用户持久化成功后发布，以新用户 ID 作为消息 key。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedEvent {
    pub event_id: String,
    pub event_type: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserCreatedEvent {
    pub fn new(
        user_id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: new_event_id(),
            event_type: event_types::USER_CREATED.to_string(),
            user_id: user_id.to_string(),
            name: name.into(),
            email: email.into(),
            created_at,
        }
    }
}

impl DomainEvent for UserCreatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn topic(&self) -> &'static str {
        topics::USER_EVENTS
    }

    fn partition_key(&self) -> &str {
        &self.user_id
    }
}

// ---------------------------------------------------------------------------
// OrderProcessedEvent
// ---------------------------------------------------------------------------

/// 订单处理事件
///
/// 由订单服务在为新用户创建占位订单后发布，携带已保存订单的 ID、金额、状态和时间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    pub order_id: String,
    pub user_id: String,
    pub total_amount: f64,
    /// 订单状态（SCREAMING_SNAKE_CASE，如 PENDING）
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl OrderProcessedEvent {
    pub fn new(
        order_id: i64,
        user_id: impl Into<String>,
        total_amount: f64,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: new_event_id(),
            event_type: event_types::ORDER_PROCESSED.to_string(),
            order_id: order_id.to_string(),
            user_id: user_id.into(),
            total_amount,
            status: status.into(),
            created_at,
        }
    }
}

impl DomainEvent for OrderProcessedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn topic(&self) -> &'static str {
        topics::ORDER_EVENTS
    }

    fn partition_key(&self) -> &str {
        &self.order_id
    }
}

// ---------------------------------------------------------------------------
// NotificationSentEvent
// ---------------------------------------------------------------------------

/// 通知已发送事件
///
/// 通知服务每处理一条上游事件就发布一条，描述实际发出的通知内容，
/// 并通过 `source_event_id` 关联触发它的上游事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSentEvent {
    pub event_id: String,
    pub event_type: String,
    pub notification_id: String,
    pub user_id: String,
    pub recipient: String,
    pub subject: String,
    pub message: String,
    pub source_event_id: String,
    pub source_event_type: String,
    pub sent_at: DateTime<Utc>,
}

impl DomainEvent for NotificationSentEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn topic(&self) -> &'static str {
        topics::NOTIFICATION_EVENTS
    }

    fn partition_key(&self) -> &str {
        &self.user_id
    }
}

impl NotificationSentEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        notification_id: impl Into<String>,
        user_id: impl Into<String>,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
        source_event_id: impl Into<String>,
        source_event_type: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: new_event_id(),
            event_type: event_types::NOTIFICATION_SENT.to_string(),
            notification_id: notification_id.into(),
            user_id: user_id.into(),
            recipient: recipient.into(),
            subject: subject.into(),
            message: message.into(),
            source_event_id: source_event_id.into(),
            source_event_type: source_event_type.into(),
            sent_at,
        }
    }
}

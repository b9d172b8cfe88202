//! 通知模板
//!
//! 根据来源事件生成收件人、标题和正文。模板为硬编码文本。

use cloudnative_shared::events::{OrderProcessedEvent, UserCreatedEvent};

/// 通知类别，同时作为 `notifications_sent_total{kind}` 的标签值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Welcome,
    OrderConfirmation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::OrderConfirmation => "order_confirmation",
        }
    }
}

/// 渲染后的通知内容
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNotification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub message: String,
}

/// 通知模板引擎
pub struct NotificationTemplateEngine;

impl NotificationTemplateEngine {
    /// 欢迎通知，发往注册邮箱
    pub fn welcome(event: &UserCreatedEvent) -> RenderedNotification {
        RenderedNotification {
            kind: NotificationKind::Welcome,
            recipient: event.email.clone(),
            subject: "Welcome to Our Platform!".to_string(),
            message: "Welcome! Your account has been created successfully.".to_string(),
        }
    }

    /// 订单确认通知
    ///
    /// 订单事件不携带邮箱，收件人由 userId 推导为 `{userId}@example.com`。
    pub fn order_confirmation(event: &OrderProcessedEvent) -> RenderedNotification {
        RenderedNotification {
            kind: NotificationKind::OrderConfirmation,
            recipient: format!("{}@example.com", event.user_id),
            subject: "Order Confirmation".to_string(),
            message: format!(
                "Your order #{} has been processed successfully. Total amount: ${:.2}",
                event.order_id, event.total_amount
            ),
        }
    }
}

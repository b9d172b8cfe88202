//! 通知发送器
//!
//! 通过 `NotificationSender` trait 抽象发送行为。当前唯一实现是
//! `LogEmailSender`：只输出结构化日志，不接入真实邮件服务。

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::NotificationError;
use crate::templates::RenderedNotification;

/// 发送结果
pub struct SendResult {
    pub channel: &'static str,
    /// 渠道返回的消息标识，用于追踪投递状态
    pub message_id: String,
}

/// 通知发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        notification_id: &str,
        notification: &RenderedNotification,
    ) -> Result<SendResult, NotificationError>;

    /// 该发送器对应的渠道名
    fn channel(&self) -> &'static str;
}

/// 模拟邮件发送器
pub struct LogEmailSender;

#[async_trait]
impl NotificationSender for LogEmailSender {
    async fn send(
        &self,
        notification_id: &str,
        notification: &RenderedNotification,
    ) -> Result<SendResult, NotificationError> {
        let message_id = Uuid::now_v7().to_string();

        info!(
            channel = "EMAIL",
            notification_id,
            kind = notification.kind.as_str(),
            recipient = %notification.recipient,
            subject = %notification.subject,
            message = %notification.message,
            message_id = %message_id,
            "模拟发送邮件通知"
        );

        Ok(SendResult {
            channel: self.channel(),
            message_id,
        })
    }

    fn channel(&self) -> &'static str {
        "EMAIL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::NotificationKind;

    #[tokio::test]
    async fn test_log_email_sender() {
        let notification = RenderedNotification {
            kind: NotificationKind::Welcome,
            recipient: "alice@example.com".to_string(),
            subject: "Welcome to Our Platform!".to_string(),
            message: "Welcome!".to_string(),
        };

        let result = LogEmailSender.send("n-1", &notification).await.unwrap();

        assert_eq!(result.channel, "EMAIL");
        assert!(!result.message_id.is_empty());
    }
}

//! 通知业务逻辑
//!
//! 流程：事件类型校验 -> 认领事件 -> 渲染模板 -> 发送 -> 发布 `notification.sent`。
//!
//! 幂等记录只在进程内有效。发送失败时撤销认领，重投会再次发送；
//! 发送成功后发布失败则保留认领，重投被当作重复跳过，不会重复发送通知，
//! 该通知对应的 `notification.sent` 也不会再补发。

use std::sync::Arc;

use chrono::Utc;
use cloudnative_shared::events::{
    NotificationSentEvent, OrderProcessedEvent, UserCreatedEvent, event_types,
};
use cloudnative_shared::idempotency::IdempotencyStore;
use cloudnative_shared::kafka::{EventPublisher, publish_event};
use cloudnative_shared::observability::metrics;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::NotificationError;
use crate::sender::NotificationSender;
use crate::templates::{NotificationTemplateEngine, RenderedNotification};

/// 幂等记录中的消费者名，与消费组同名
pub const CONSUMER_NAME: &str = "notification-service";

/// 来源事件的公共信息
struct SourceEvent<'a> {
    event_id: &'a str,
    event_type: &'a str,
    user_id: &'a str,
}

pub struct NotificationService {
    sender: Arc<dyn NotificationSender>,
    idempotency: Arc<dyn IdempotencyStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl NotificationService {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        idempotency: Arc<dyn IdempotencyStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            sender,
            idempotency,
            publisher,
        }
    }

    /// 新用户欢迎通知
    #[instrument(skip(self, event), fields(event_id = %event.event_id))]
    pub async fn on_user_created(
        &self,
        event: &UserCreatedEvent,
    ) -> Result<NotificationSentEvent, NotificationError> {
        let source = SourceEvent {
            event_id: &event.event_id,
            event_type: &event.event_type,
            user_id: &event.user_id,
        };
        self.claim(&source, event_types::USER_CREATED).await?;

        self.deliver(&source, NotificationTemplateEngine::welcome(event))
            .await
    }

    /// 订单确认通知
    #[instrument(skip(self, event), fields(event_id = %event.event_id))]
    pub async fn on_order_processed(
        &self,
        event: &OrderProcessedEvent,
    ) -> Result<NotificationSentEvent, NotificationError> {
        let source = SourceEvent {
            event_id: &event.event_id,
            event_type: &event.event_type,
            user_id: &event.user_id,
        };
        self.claim(&source, event_types::ORDER_PROCESSED).await?;

        self.deliver(&source, NotificationTemplateEngine::order_confirmation(event))
            .await
    }

    /// 校验事件类型并认领事件
    async fn claim(
        &self,
        source: &SourceEvent<'_>,
        expected_type: &str,
    ) -> Result<(), NotificationError> {
        if source.event_type != expected_type {
            return Err(NotificationError::UnsupportedEventType {
                event_type: source.event_type.to_string(),
            });
        }

        if !self
            .idempotency
            .mark_processed(CONSUMER_NAME, source.event_id)
            .await?
        {
            return Err(NotificationError::AlreadyProcessed {
                event_id: source.event_id.to_string(),
            });
        }

        Ok(())
    }

    async fn deliver(
        &self,
        source: &SourceEvent<'_>,
        rendered: RenderedNotification,
    ) -> Result<NotificationSentEvent, NotificationError> {
        let notification_id = Uuid::now_v7().to_string();
        let kind = rendered.kind.as_str();

        let result = self.sender.send(&notification_id, &rendered).await;
        metrics::record_notification_sent(kind, result.is_ok());
        let send_result = match result {
            Ok(send_result) => send_result,
            Err(e) => {
                if let Err(release_err) = self
                    .idempotency
                    .release(CONSUMER_NAME, source.event_id)
                    .await
                {
                    warn!(error = %release_err, "撤销事件认领失败");
                }
                return Err(e);
            }
        };

        let sent = NotificationSentEvent::new(
            notification_id,
            source.user_id,
            rendered.recipient,
            rendered.subject,
            rendered.message,
            source.event_id,
            source.event_type,
            Utc::now(),
        );
        publish_event(self.publisher.as_ref(), &sent)
            .await
            .map_err(NotificationError::EventPublish)?;

        info!(
            notification_id = %sent.notification_id,
            kind,
            channel = send_result.channel,
            message_id = %send_result.message_id,
            "通知已发送"
        );

        Ok(sent)
    }
}

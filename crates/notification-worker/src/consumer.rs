//! Kafka 消费者
//!
//! 同时订阅 `user-events` 和 `order-events`，按 topic 分发给 `NotificationService`。

use std::sync::Arc;

use cloudnative_shared::config::KafkaConfig;
use cloudnative_shared::events::{OrderProcessedEvent, UserCreatedEvent};
use cloudnative_shared::kafka::{ConsumerMessage, KafkaConsumer, topics};
use cloudnative_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::NotificationError;
use crate::service::NotificationService;

const SUBSCRIBED_TOPICS: [&str; 2] = [topics::USER_EVENTS, topics::ORDER_EVENTS];

/// 通知事件消费者
pub struct NotificationConsumer {
    consumer: KafkaConsumer,
    service: Arc<NotificationService>,
}

impl NotificationConsumer {
    pub fn new(
        config: &KafkaConfig,
        service: Arc<NotificationService>,
    ) -> Result<Self, NotificationError> {
        let consumer = KafkaConsumer::new(config, None)?;
        Ok(Self { consumer, service })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), NotificationError> {
        self.consumer.subscribe(&SUBSCRIBED_TOPICS)?;

        info!(topics = ?SUBSCRIBED_TOPICS, "通知消费者已启动");

        let service = self.service;

        self.consumer
            .start(shutdown, |msg| {
                let service = &service;
                async move {
                    let _ = handle_message(service, &msg).await;
                    Ok(())
                }
            })
            .await;

        info!("通知消费者已停止");
        Ok(())
    }
}

/// 处理单条 Kafka 消息并记录 `events_consumed_total{outcome}`
pub async fn handle_message(
    service: &NotificationService,
    msg: &ConsumerMessage,
) -> Result<(), NotificationError> {
    let result = dispatch(service, msg).await;

    match &result {
        Ok(()) => metrics::record_event_consumed(&msg.topic, "processed"),
        Err(e) => {
            let outcome = e.consume_outcome();
            metrics::record_event_consumed(&msg.topic, outcome);
            match outcome {
                "duplicate" => info!(error = %e, "重复事件，已跳过"),
                "rejected" => warn!(
                    error = %e,
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    "事件被拒绝"
                ),
                _ => error!(
                    error = %e,
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    "处理通知事件失败"
                ),
            }
        }
    }

    result
}

async fn dispatch(
    service: &NotificationService,
    msg: &ConsumerMessage,
) -> Result<(), NotificationError> {
    match msg.topic.as_str() {
        topics::USER_EVENTS => {
            let event: UserCreatedEvent = msg.deserialize_payload()?;
            info!(event_id = %event.event_id, user_id = %event.user_id, "收到用户事件");
            service.on_user_created(&event).await?;
        }
        topics::ORDER_EVENTS => {
            let event: OrderProcessedEvent = msg.deserialize_payload()?;
            info!(event_id = %event.event_id, order_id = %event.order_id, "收到订单事件");
            service.on_order_processed(&event).await?;
        }
        other => return Err(NotificationError::UnknownTopic(other.to_string())),
    }
    Ok(())
}

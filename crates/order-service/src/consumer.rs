//! Kafka 消费者
//!
//! 订阅 `user-events`，将 `user.created` 交给 `OrderService` 处理。

use std::sync::Arc;

use cloudnative_shared::config::KafkaConfig;
use cloudnative_shared::events::UserCreatedEvent;
use cloudnative_shared::kafka::{ConsumerMessage, KafkaConsumer, topics};
use cloudnative_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{OrderError, Result};
use crate::service::OrderService;

/// 用户事件消费者
pub struct OrderConsumer {
    consumer: KafkaConsumer,
    service: Arc<OrderService>,
}

impl OrderConsumer {
    pub fn new(config: &KafkaConfig, service: Arc<OrderService>) -> Result<Self> {
        let consumer = KafkaConsumer::new(config, None)?;
        Ok(Self { consumer, service })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.consumer.subscribe(&[topics::USER_EVENTS])?;

        info!(topic = topics::USER_EVENTS, "用户事件消费者已启动");

        let service = self.service;

        self.consumer
            .start(shutdown, |msg| {
                let service = &service;
                async move {
                    // 错误在 handle_message 内部已分类记录，这里不再让消费循环感知
                    let _ = handle_message(service, &msg).await;
                    Ok(())
                }
            })
            .await;

        info!("用户事件消费者已停止");
        Ok(())
    }
}

/// 处理单条 Kafka 消息
///
/// 拆分为独立函数，测试中直接调用而无需构造 Kafka 客户端。
/// 每条消息都会记录一次 `events_consumed_total{outcome}`。
pub async fn handle_message(service: &OrderService, msg: &ConsumerMessage) -> Result<()> {
    let result = process(service, msg).await;

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
                    "处理用户事件失败"
                ),
            }
        }
    }

    result
}

async fn process(service: &OrderService, msg: &ConsumerMessage) -> Result<()> {
    let event: UserCreatedEvent = msg.deserialize_payload().map_err(OrderError::Shared)?;

    info!(
        event_id = %event.event_id,
        event_type = %event.event_type,
        user_id = %event.user_id,
        "收到用户事件"
    );

    service.on_user_created(&event).await?;
    Ok(())
}

//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为业务友好的 Producer/Consumer 抽象，
//! 统一消息序列化、追踪上下文传播、错误映射和优雅关闭语义。
//!
//! 业务代码只依赖 `EventPublisher` trait，测试时以内存实现替换真实生产者。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::KafkaConfig;
use crate::error::PlatformError;
use crate::events::DomainEvent;
use crate::observability::{metrics, tracing as otel};

// ---------------------------------------------------------------------------
// Topic 常量
// ---------------------------------------------------------------------------

/// 集中管理所有 Kafka topic 名称，防止字符串散落在各服务中导致拼写不一致
pub mod topics {
    pub const USER_EVENTS: &str = "user-events";
    pub const ORDER_EVENTS: &str = "order-events";
    pub const NOTIFICATION_EVENTS: &str = "notification-events";
}

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub timestamp: Option<i64>,
    pub headers: HashMap<String, String>,
}

impl ConsumerMessage {
    /// 从 rdkafka 的借用消息构造，提取并拥有所有字段
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let key = msg
            .key()
            .and_then(|k| std::str::from_utf8(k).ok())
            .map(String::from);

        let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();

        let timestamp = msg.timestamp().to_millis();

        let mut headers = HashMap::new();
        if let Some(h) = msg.headers() {
            for idx in 0..h.count() {
                let header = h.get(idx);
                if let Some(raw) = header.value
                    && let Ok(value) = std::str::from_utf8(raw)
                {
                    headers.insert(header.key.to_string(), value.to_string());
                }
            }
        }

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key,
            payload,
            timestamp,
            headers,
        }
    }

    /// 将负载视为 UTF-8 字符串返回
    pub fn payload_str(&self) -> Result<&str, PlatformError> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| PlatformError::Kafka(format!("负载非 UTF-8 编码: {e}")))
    }

    /// 将 JSON 格式负载反序列化为目标类型
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T, PlatformError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| PlatformError::Serialization(format!("负载反序列化失败: {e}")))
    }
}

// ---------------------------------------------------------------------------
// EventPublisher
// ---------------------------------------------------------------------------

/// 事件发布抽象
///
/// 服务层只依赖该 trait；生产环境由 `KafkaProducer` 实现，
/// 测试中使用 `test_utils::RecordingPublisher` 记录发出的消息。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 发送一条已序列化的消息
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PlatformError>;
}

/// 将领域事件序列化为 JSON 并发布到其所属 topic
///
/// 发布失败原样返回给调用方，本层不做重试，投递可靠性交由 Kafka 客户端配置保证。
pub async fn publish_event<E: DomainEvent>(
    publisher: &dyn EventPublisher,
    event: &E,
) -> Result<(), PlatformError> {
    let payload = serde_json::to_vec(event)
        .map_err(|e| PlatformError::Serialization(format!("事件序列化失败: {e}")))?;

    let result = publisher
        .publish(event.topic(), event.partition_key(), &payload)
        .await;

    metrics::record_event_published(event.topic(), result.is_ok());

    match &result {
        Ok(()) => debug!(
            topic = event.topic(),
            event_id = event.event_id(),
            event_type = event.event_type(),
            "事件已发布"
        ),
        Err(e) => error!(
            topic = event.topic(),
            event_id = event.event_id(),
            event_type = event.event_type(),
            error = %e,
            "事件发布失败"
        ),
    }

    result
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 生产者
///
/// 封装 `FutureProducer`，内部已派生 Clone（`FutureProducer` 本身是 Arc 包装的）。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaProducer {
    /// 根据配置创建生产者
    ///
    /// `message.timeout.ms` 超时后视为发送失败，由调用方决定如何处理。
    pub fn new(config: &KafkaConfig) -> Result<Self, PlatformError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()
            .map_err(|e| PlatformError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(brokers = %config.brokers, "Kafka 生产者已初始化");
        Ok(Self {
            producer,
            send_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }

    /// 发送原始字节消息，附带当前追踪上下文
    pub async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(i32, i64), PlatformError> {
        let mut trace_headers = HashMap::new();
        otel::inject_to_headers(&mut trace_headers);

        let mut headers = OwnedHeaders::new();
        for (name, value) in &trace_headers {
            headers = headers.insert(Header {
                key: name.as_str(),
                value: Some(value.as_str()),
            });
        }

        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload)
            .headers(headers);

        let delivery = self
            .producer
            .send(record, self.send_timeout)
            .await
            .map_err(|(e, _)| PlatformError::Kafka(format!("发送消息失败: {e}")))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok((delivery.partition, delivery.offset))
    }
}

#[async_trait]
impl EventPublisher for KafkaProducer {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PlatformError> {
        self.send(topic, key, payload).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// KafkaConsumer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 消费者
///
/// 封装 `StreamConsumer` 并提供基于 `watch` channel 的优雅关闭语义，
/// 确保进程退出时正在处理的消息能够完成。
pub struct KafkaConsumer {
    consumer: StreamConsumer,
}

impl KafkaConsumer {
    /// 创建消费者
    ///
    /// `group_id_suffix` 允许同一服务内不同消费逻辑使用独立的消费组。
    pub fn new(config: &KafkaConfig, group_id_suffix: Option<&str>) -> Result<Self, PlatformError> {
        let group_id = match group_id_suffix {
            Some(suffix) => format!("{}.{}", config.consumer_group, suffix),
            None => config.consumer_group.clone(),
        };

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "true")
            .create()
            .map_err(|e| PlatformError::Kafka(format!("创建消费者失败: {e}")))?;

        info!(brokers = %config.brokers, group_id, "Kafka 消费者已初始化");
        Ok(Self { consumer })
    }

    /// 订阅指定的 topic 列表
    pub fn subscribe(&self, topics: &[&str]) -> Result<(), PlatformError> {
        self.consumer
            .subscribe(topics)
            .map_err(|e| PlatformError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(?topics, "已订阅 Kafka topics");
        Ok(())
    }

    /// 启动消费循环
    ///
    /// 使用 `tokio::select!` 同时监听消息流和关闭信号：
    /// - 收到消息时在带有上游追踪上下文的 span 中调用 handler；handler 返回错误只记录日志，
    ///   单条坏消息不会让整个消费者停止。
    /// - 关闭信号变为 `true` 时退出循环，正在执行的 handler 会先完成。
    pub async fn start<F, Fut>(self, mut shutdown: watch::Receiver<bool>, handler: F)
    where
        F: Fn(ConsumerMessage) -> Fut,
        Fut: std::future::Future<Output = Result<(), PlatformError>>,
    {
        use futures::StreamExt;

        let stream = self.consumer.stream();
        futures::pin_mut!(stream);

        info!("Kafka 消费循环已启动");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("收到关闭信号，Kafka 消费循环退出");
                        break;
                    }
                }

                msg_result = stream.next() => {
                    let Some(msg_result) = msg_result else {
                        warn!("Kafka 消息流意外结束");
                        break;
                    };

                    match msg_result {
                        Ok(borrowed_msg) => {
                            let msg = ConsumerMessage::from_borrowed(&borrowed_msg);
                            let span = info_span!(
                                "kafka_message",
                                topic = %msg.topic,
                                partition = msg.partition,
                                offset = msg.offset,
                            );
                            otel::set_span_parent(&span, &msg.headers);

                            debug!(
                                topic = %msg.topic,
                                partition = msg.partition,
                                offset = msg.offset,
                                "收到 Kafka 消息"
                            );

                            if let Err(e) = handler(msg).instrument(span).await {
                                error!(error = %e, "处理 Kafka 消息失败");
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "接收 Kafka 消息出错");
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::UserCreatedEvent;
    use chrono::Utc;

    fn make_message(payload: &[u8]) -> ConsumerMessage {
        ConsumerMessage {
            topic: topics::USER_EVENTS.to_string(),
            partition: 0,
            offset: 0,
            key: None,
            payload: payload.to_vec(),
            timestamp: None,
            headers: HashMap::new(),
        }
    }

    #[test]
    fn test_topic_constants() {
        assert_eq!(topics::USER_EVENTS, "user-events");
        assert_eq!(topics::ORDER_EVENTS, "order-events");
        assert_eq!(topics::NOTIFICATION_EVENTS, "notification-events");
    }

    #[test]
    fn test_consumer_message_deserialize() {
        let event = UserCreatedEvent::new(1, "Test User", "test@example.com", Utc::now());
        let msg = make_message(&serde_json::to_vec(&event).unwrap());

        let decoded: UserCreatedEvent = msg.deserialize_payload().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_consumer_message_deserialize_invalid_json() {
        let msg = make_message(b"not json");
        let result: Result<serde_json::Value, _> = msg.deserialize_payload();
        assert!(matches!(result, Err(PlatformError::Serialization(_))));
    }

    #[test]
    fn test_consumer_message_payload_str() {
        assert_eq!(make_message(b"hello world").payload_str().unwrap(), "hello world");
        assert!(make_message(&[0xFF, 0xFE]).payload_str().is_err());
    }

    #[tokio::test]
    async fn test_publish_event_uses_event_topic_and_key() {
        let event = UserCreatedEvent::new(42, "Test User", "test@example.com", Utc::now());
        let expected_payload = serde_json::to_vec(&event).unwrap();

        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(move |topic, key, payload| {
                topic == topics::USER_EVENTS && key == "42" && payload == expected_payload.as_slice()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        publish_event(&publisher, &event).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_event_propagates_failure() {
        let event = UserCreatedEvent::new(42, "Test User", "test@example.com", Utc::now());

        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_, _, _| Err(PlatformError::Kafka("broker 不可达".to_string())));

        let result = publish_event(&publisher, &event).await;
        assert!(matches!(result, Err(PlatformError::Kafka(_))));
    }
}

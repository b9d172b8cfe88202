//! 通知服务
//!
//! 消费用户和订单事件，发送模拟邮件通知并发布 `notification.sent`。

use std::sync::Arc;

use cloudnative_shared::{
    config::AppConfig,
    idempotency::MemoryIdempotencyStore,
    kafka::KafkaProducer,
    observability,
    shutdown::{ShutdownNotifier, shutdown_signal},
};
use notification_worker::{
    NotificationService, consumer::NotificationConsumer, sender::LogEmailSender,
};
use tracing::info;

const SERVICE_NAME: &str = "notification-worker";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(environment = %config.environment, "Starting {}", SERVICE_NAME);

    let producer = Arc::new(KafkaProducer::new(&config.kafka)?);
    let service = Arc::new(NotificationService::new(
        Arc::new(LogEmailSender),
        Arc::new(MemoryIdempotencyStore::new()),
        producer,
    ));

    let shutdown = ShutdownNotifier::new();
    let consumer = NotificationConsumer::new(&config.kafka, service)?;
    let consumer_task = tokio::spawn(consumer.run(shutdown.subscribe()));

    let signal = async {
        shutdown_signal().await;
        Ok::<_, anyhow::Error>(())
    };
    shutdown
        .supervise(signal, consumer_task, "notification consumer")
        .await?;

    info!("Worker shutdown complete");
    Ok(())
}

//! 订单服务
//!
//! 同时运行 HTTP 服务（订单查询）和 `user-events` 消费者（创建占位订单）。

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get};
use cloudnative_shared::{
    config::AppConfig,
    database::{self, Database},
    kafka::KafkaProducer,
    observability::{self, middleware as obs_middleware},
    shutdown::{ShutdownNotifier, shutdown_signal},
};
use order_service::{
    OrderService,
    consumer::OrderConsumer,
    repository::{PgIdempotencyStore, PgOrderRepository},
    routes,
    state::AppState,
};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

const SERVICE_NAME: &str = "order-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(environment = %config.environment, "Starting {} on {}", SERVICE_NAME, config.server_addr());

    let db = Database::connect(&config.database).await?;
    db.run_migrations(&order_service::migrator()).await?;

    let producer = Arc::new(KafkaProducer::new(&config.kafka)?);
    let service = Arc::new(OrderService::new(
        Arc::new(PgOrderRepository::new(db.pool().clone())),
        Arc::new(PgIdempotencyStore::new(db.pool().clone())),
        producer,
    ));

    let shutdown = ShutdownNotifier::new();
    let consumer = OrderConsumer::new(&config.kafka, service.clone())?;
    let consumer_task = tokio::spawn(consumer.run(shutdown.subscribe()));

    let app = routes::router()
        .route(
            "/ready",
            get({
                let db_for_ready = db.clone();
                move || database::readiness(db_for_ready.clone(), SERVICE_NAME)
            }),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(AppState::new(service));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    let server = async {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok::<_, anyhow::Error>(())
    };

    // HTTP 停止后通知消费循环退出；消费循环提前结束则整个进程以错误退出
    let result = shutdown
        .supervise(server, consumer_task, "user-events consumer")
        .await;

    db.close().await;
    info!("Server shutdown complete");

    result
}

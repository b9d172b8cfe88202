//! 用户服务
//!
//! 提供用户创建与查询 REST API，用户创建后发布 `user.created` 事件。

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get};
use cloudnative_shared::{
    config::AppConfig,
    database::{self, Database},
    kafka::KafkaProducer,
    observability::{self, middleware as obs_middleware},
    shutdown::shutdown_signal,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::info;
use user_service::{
    UserService, repository::PgUserRepository, routes, state::AppState,
};

const SERVICE_NAME: &str = "user-service";

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
    db.run_migrations(&user_service::migrator()).await?;

    let producer = Arc::new(KafkaProducer::new(&config.kafka)?);
    let repo = Arc::new(PgUserRepository::new(db.pool().clone()));
    let state = AppState::new(Arc::new(UserService::new(repo, producer)));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

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
        .layer(cors)
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

//! PostgreSQL 连接池
//!
//! 用户服务和订单服务各自持有一个 [`Database`]：启动时建池并执行本服务的迁移，
//! `/ready` 探针通过 [`readiness`] 检查连接可用性，退出时关闭连接池。

use std::time::{Duration, Instant};

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::{PlatformError, Result};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip(config), fields(target = %redact_url(&config.url)))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "数据库连接池已建立"
        );
        Ok(Self { pool })
    }

    /// 复用外部创建的连接池（集成测试）
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行一次 `SELECT 1`，返回往返耗时
    pub async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(started.elapsed())
    }

    /// 执行服务自己的迁移，Migrator 由各服务 crate 的 `migrator()` 提供
    #[instrument(skip_all)]
    pub async fn run_migrations(&self, migrator: &Migrator) -> Result<()> {
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| PlatformError::Migration(e.to_string()))?;
        info!(migrations = migrator.iter().count(), "数据库迁移完成");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}

/// `/ready` 探针：数据库不可用时返回 503
pub async fn readiness(db: Database, service: &'static str) -> (StatusCode, Json<Value>) {
    let (status, body) = readiness_report(service, &db.ping().await);
    (status, Json(body))
}

fn readiness_report(service: &str, ping: &Result<Duration>) -> (StatusCode, Value) {
    match ping {
        Ok(latency) => (
            StatusCode::OK,
            json!({
                "status": "ok",
                "service": service,
                "checks": {
                    "database": { "status": "ok", "latencyMs": latency.as_millis() as u64 }
                }
            }),
        ),
        Err(e) => {
            warn!(error = %e, "数据库就绪检查失败");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "status": "degraded",
                    "service": service,
                    "checks": {
                        "database": { "status": "fail" }
                    }
                }),
            )
        }
    }
}

/// 去掉连接串中的密码，用于日志
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

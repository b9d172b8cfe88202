//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册通用指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("user_created_total", "Total number of created users");
    metrics::describe_counter!("orders_created_total", "Total number of created orders");
    metrics::describe_counter!(
        "notifications_sent_total",
        "Total number of notifications sent"
    );

    metrics::describe_counter!("events_published_total", "Total number of published events");
    metrics::describe_counter!("events_consumed_total", "Total number of consumed events");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录用户创建
///
/// 只按邮箱域名打标签，用户 ID 基数过高不适合作为标签。
#[inline]
pub fn record_user_created(email_domain: &str) {
    metrics::counter!(
        "user_created_total",
        "email_domain" => email_domain.to_string()
    )
    .increment(1);
}

/// 记录订单创建
#[inline]
pub fn record_order_created(status: &str) {
    metrics::counter!("orders_created_total", "status" => status.to_string()).increment(1);
}

/// 记录通知发送
#[inline]
pub fn record_notification_sent(kind: &str, success: bool) {
    metrics::counter!(
        "notifications_sent_total",
        "kind" => kind.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// 记录事件发布
#[inline]
pub fn record_event_published(topic: &str, success: bool) {
    let status = if success { "ok" } else { "error" };
    metrics::counter!(
        "events_published_total",
        "topic" => topic.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录事件消费结果（processed / duplicate / rejected / failed）
#[inline]
pub fn record_event_consumed(topic: &str, outcome: &str) {
    metrics::counter!(
        "events_consumed_total",
        "topic" => topic.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 未安装 recorder 时这些调用都是空操作
        record_http_request("GET", "/api/v1/users/1", 200, 0.1);
        record_user_created("example.com");
        record_order_created("PENDING");
        record_notification_sent("welcome", true);
        record_event_published("user-events", true);
        record_event_published("user-events", false);
        record_event_consumed("user-events", "processed");
    }

    #[test]
    fn test_handle_absent_before_init() {
        assert!(get_handle().is_none());
    }
}

//! 路由配置

use axum::{Router, routing::get};

use crate::{handlers, state::AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new().route(
        "/orders/user/{user_id}",
        get(handlers::get_orders_by_user),
    )
}

/// 业务路由与存活探针，就绪探针由 `main` 追加
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(handlers::health_check))
}

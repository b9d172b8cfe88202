//! 订单 API 处理器

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use cloudnative_shared::response::ApiResponse;
use serde_json::{Value, json};

use crate::{error::OrderError, models::Order, state::AppState};

/// 查询用户订单
///
/// GET /api/v1/orders/user/{user_id}
///
/// 用户没有订单时返回空列表。
pub async fn get_orders_by_user(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<Order>>>, OrderError> {
    let Path(user_id) =
        user_id.map_err(|e| OrderError::Validation(format!("userId: {}", e.body_text())))?;

    let orders = state.order_service.get_orders_by_user(user_id).await?;

    Ok(Json(ApiResponse::success(orders)))
}

/// 存活探针
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "order-service"
    }))
}

//! 用户 API 处理器

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use cloudnative_shared::response::ApiResponse;
use serde_json::{Value, json};

use crate::{
    dto::CreateUserRequest,
    error::UserError,
    models::User,
    state::AppState,
};

/// 创建用户
///
/// POST /api/v1/users
///
/// 请求体无法解析时同样以 `VALIDATION_ERROR` 包装返回，保持响应格式统一。
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<User>>, UserError> {
    let Json(req) = payload.map_err(|e| UserError::Validation(e.body_text()))?;

    let user = state.user_service.create_user(&req).await?;

    Ok(Json(ApiResponse::success(user)))
}

/// 获取用户
///
/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<User>>, UserError> {
    let Path(id) = id.map_err(|e| UserError::Validation(format!("id: {}", e.body_text())))?;

    let user = state.user_service.get_user(id).await?;

    Ok(Json(ApiResponse::success(user)))
}

/// 存活探针
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "user-service"
    }))
}

//! REST 统一响应
//!
//! 用户服务和订单服务的所有接口都返回 `{ success, code, message, data }`，
//! 错误响应的 `data` 为 null。

use std::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// 5xx 错误对外返回的通用提示
pub const INTERNAL_ERROR_MESSAGE: &str = "服务内部错误，请稍后重试";

/// API 统一响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 创建错误响应
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }
}

/// 将服务错误转为 HTTP 响应
///
/// 5xx 只返回 [`INTERNAL_ERROR_MESSAGE`]，错误详情写入日志；其余状态码直接返回错误描述。
pub fn error_response(status: StatusCode, code: &str, error: &dyn Display) -> Response {
    let message = if status.is_server_error() {
        tracing::error!(error = %error, code, "请求处理失败");
        INTERNAL_ERROR_MESSAGE.to_string()
    } else {
        error.to_string()
    };

    (status, Json(ApiResponse::error(code, message))).into_response()
}

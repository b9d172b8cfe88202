//! 用户服务错误类型
//!
//! 业务错误直接映射为 HTTP 状态码和错误码；数据库、事件发布等系统错误
//! 对外只返回通用提示，细节仅写入日志。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cloudnative_shared::error::PlatformError;
use cloudnative_shared::response::error_response;

/// 用户服务错误
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("邮箱已被注册: {0}")]
    EmailAlreadyExists(String),

    #[error("事件发布失败: {0}")]
    EventPublish(PlatformError),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Shared(#[from] PlatformError),
}

impl UserError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailAlreadyExists(_) => StatusCode::CONFLICT,
            Self::Shared(PlatformError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Shared(PlatformError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::EventPublish(_) | Self::Database(_) | Self::Shared(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::EmailAlreadyExists(_) => "EMAIL_ALREADY_EXISTS",
            Self::EventPublish(_) => "EVENT_PUBLISH_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Shared(e) => e.code(),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.error_code(), &self)
    }
}

/// 从 validator 错误转换
///
/// 按字段名排序输出 `field: reason`，同一字段的多个原因以逗号分隔。
impl From<validator::ValidationErrors> for UserError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect();
        fields.sort();

        Self::Validation(fields.join("; "))
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, UserError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::CreateUserRequest;
    use validator::Validate;

    #[test]
    fn test_status_and_code_mapping() {
        let cases = [
            (UserError::Validation("x".into()), 400, "VALIDATION_ERROR"),
            (UserError::UserNotFound(1), 404, "USER_NOT_FOUND"),
            (
                UserError::EmailAlreadyExists("a@example.com".into()),
                409,
                "EMAIL_ALREADY_EXISTS",
            ),
            (
                UserError::EventPublish(PlatformError::Kafka("down".into())),
                500,
                "EVENT_PUBLISH_FAILED",
            ),
            (
                UserError::Shared(PlatformError::Internal("x".into())),
                500,
                "INTERNAL_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code().as_u16(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let errors = CreateUserRequest::new("", "bad").validate().unwrap_err();
        let UserError::Validation(message) = UserError::from(errors) else {
            panic!("expected validation error");
        };

        assert!(message.starts_with("email: "));
        assert!(message.contains("邮箱格式不正确"));
        assert!(message.contains("name: 不能为空"));
    }

    #[test]
    fn test_server_error_hides_details() {
        let response =
            UserError::EventPublish(PlatformError::Kafka("broker-1:9092".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! 用户服务
//!
//! 提供用户创建与查询的 REST API。用户写入数据库后向 `user-events`
//! 发布 `user.created` 事件，订单服务和通知服务据此触发后续流程。
//!
//! ## 模块结构
//!
//! - `models`: 用户实体
//! - `dto`: 请求体与参数校验
//! - `error`: 错误类型及 HTTP 映射
//! - `repository`: 用户仓储（trait + PostgreSQL 实现）
//! - `service`: 创建/查询业务逻辑
//! - `handlers` / `routes` / `state`: axum 接入层
//! - `testing`: 测试用内存仓储（仅测试或启用 `testing` feature 时编译）

pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cloudnative_shared::response::ApiResponse;
pub use dto::CreateUserRequest;
pub use error::{Result, UserError};
pub use models::{NewUser, User};
pub use service::UserService;

/// 用户服务自己的数据库迁移
///
/// 多个服务可能共用同一个库，忽略其他服务写入的迁移记录。
pub fn migrator() -> sqlx::migrate::Migrator {
    let mut migrator = sqlx::migrate!();
    migrator.set_ignore_missing(true);
    migrator
}

//! 应用状态定义

use std::sync::Arc;

use crate::service::UserService;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
}

impl AppState {
    pub fn new(user_service: Arc<UserService>) -> Self {
        Self { user_service }
    }
}

//! 应用状态定义

use std::sync::Arc;

use crate::service::OrderService;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<OrderService>,
}

impl AppState {
    pub fn new(order_service: Arc<OrderService>) -> Self {
        Self { order_service }
    }
}

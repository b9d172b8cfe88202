//! 共享库
//!
//! 包含用户、订单、通知三个服务共用的配置、错误处理、数据库连接、
//! Kafka 收发、领域事件、幂等记录、REST 统一响应、关闭信号以及可观测性等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod kafka;
pub mod observability;
pub mod response;
pub mod shutdown;
pub mod test_utils;

//! 进程关闭信号
//!
//! K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。HTTP 服务把
//! [`shutdown_signal`] 交给 axum 的优雅关闭，Kafka 消费循环则订阅
//! [`ShutdownNotifier`] 发出的 `watch` 信号。
//!
//! 消费循环提前退出（订阅失败、消息流结束）时，[`ShutdownNotifier::supervise`]
//! 让进程以错误退出，交由编排系统重启，而不是继续以半工作状态运行。

use std::future::Future;

use anyhow::anyhow;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 等待 Ctrl+C 或 SIGTERM
///
/// 信号处理器注册失败时只记录日志，对应分支永不完成。
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 广播关闭信号
///
/// 持有 `watch` 发送端，多个消费循环各自持有一个接收端。
pub struct ShutdownNotifier {
    tx: watch::Sender<bool>,
}

impl ShutdownNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// 通知所有订阅者退出
    pub fn trigger(&self) {
        // 没有订阅者时 send 返回错误，send_replace 总会更新值
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// 同时等待前台任务和后台消费任务
    ///
    /// - 前台任务（HTTP 服务或关闭信号）先结束：通知后台退出并等待其完成。
    /// - 后台任务先结束：无论成功与否都返回错误，前台任务随之被丢弃。
    pub async fn supervise<F, E>(
        &self,
        foreground: F,
        mut background: JoinHandle<Result<(), E>>,
        background_name: &str,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = anyhow::Result<()>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::select! {
            result = foreground => {
                self.trigger();
                let background_result = background.await?;
                result?;
                background_result?;
                Ok(())
            }
            joined = &mut background => {
                self.trigger();
                joined??;
                error!(task = background_name, "后台任务意外结束");
                Err(anyhow!("{background_name} 意外结束"))
            }
        }
    }
}

impl Default for ShutdownNotifier {
    fn default() -> Self {
        Self::new()
    }
}

//! 所有权交接：调用方与执行单元之间「恰好一方回收」
//!
//! 状态机：Running → Finished（等待调用方取走）| Abandoned（调用方已离开）→ Reclaimed。
//! 两侧在读写状态前都必须获取同一把互斥锁；锁只在状态切换期间持有，从不跨越 I/O 或 await。

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

enum Phase<T> {
    Running,
    Finished(T),
    Abandoned,
    Reclaimed,
}

/// 交接点：执行单元 finish 交付结果，调用方 try_take 取走或 abandon 放弃
pub struct Handoff<T> {
    phase: Mutex<Phase<T>>,
    ready: Notify,
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Running),
            ready: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase<T>> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 执行单元完成时调用。
    ///
    /// 返回 `None`：结果已交给调用方并发出就绪信号；
    /// 返回 `Some(value)`：调用方已放弃，执行单元必须自行回收 value。
    pub fn finish(&self, value: T) -> Option<T> {
        let mut phase = self.lock();
        match std::mem::replace(&mut *phase, Phase::Reclaimed) {
            Phase::Running => {
                *phase = Phase::Finished(value);
                drop(phase);
                self.ready.notify_one();
                None
            }
            Phase::Abandoned => {
                tracing::debug!("handoff: caller gone, unit reclaims");
                Some(value)
            }
            other => {
                tracing::warn!("handoff: finish called twice");
                *phase = other;
                Some(value)
            }
        }
    }

    /// 调用方：若已完成则取走结果（之后由调用方回收）
    pub fn try_take(&self) -> Option<T> {
        let mut phase = self.lock();
        match std::mem::replace(&mut *phase, Phase::Reclaimed) {
            Phase::Finished(value) => Some(value),
            other => {
                *phase = other;
                None
            }
        }
    }

    /// 调用方放弃等待。
    ///
    /// 仍在运行：标记 Abandoned，所有权转移给执行单元，返回 `None`；
    /// 恰好已完成：调用方照常回收，返回 `Some(value)`。
    pub fn abandon(&self) -> Option<T> {
        let mut phase = self.lock();
        match std::mem::replace(&mut *phase, Phase::Reclaimed) {
            Phase::Running => {
                *phase = Phase::Abandoned;
                tracing::debug!("handoff: abandoned while running");
                None
            }
            Phase::Finished(value) => Some(value),
            other => {
                *phase = other;
                None
            }
        }
    }

    /// 等待就绪信号（finish 之后的 notify 会被保存，不会丢失）
    pub async fn ready(&self) {
        self.ready.notified().await;
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock(), Phase::Running)
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

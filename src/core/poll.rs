//! 协作式取消：轮询钩子
//!
//! 长时间等待（Shell 任务、目录扫描）按固定间隔调用 PollHook；返回 true 表示请求中止。
//! 钩子只改变「如何处理结果」，从不强制终止外部进程。

use tokio_util::sync::CancellationToken;

/// 轮询钩子：等待期间被周期性调用
pub trait PollHook: Send + Sync {
    /// 是否请求提前中止
    fn abort_requested(&self) -> bool;
}

impl PollHook for CancellationToken {
    fn abort_requested(&self) -> bool {
        self.is_cancelled()
    }
}

/// 永不中止的钩子（同步调用 / 测试用）
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverAbort;

impl PollHook for NeverAbort {
    fn abort_requested(&self) -> bool {
        false
    }
}

//! 工具调用事件：每次工具调用前后通知观察者（仅供展示，不影响控制流）

use serde::Serialize;
use tokio::sync::mpsc;

/// 工具调用阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolPhase {
    Executing,
    Done,
    Error,
}

impl ToolPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolPhase::Executing => "executing",
            ToolPhase::Done => "done",
            ToolPhase::Error => "error",
        }
    }
}

/// 单条事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolEvent {
    pub tool: String,
    pub phase: ToolPhase,
    /// executing：输入摘要；done / error：结果摘要
    pub detail: String,
}

/// 观察者：由 Agent 在控制任务中同步调用
pub trait ToolObserver: Send + Sync {
    fn on_tool_event(&self, event: &ToolEvent);
}

/// 转发到 channel，接收端已关闭时静默丢弃
impl ToolObserver for mpsc::UnboundedSender<ToolEvent> {
    fn on_tool_event(&self, event: &ToolEvent) {
        let _ = self.send(event.clone());
    }
}

//! 工具执行器
//!
//! 持有 ToolRegistry，execute(tool_name, args, ctx) 将结果统一为 ToolOutcome；
//! 未知工具与工具失败都作为 is_error 结果返回，不会中断对话。每次调用输出结构化审计日志（JSON）。
//! 不设超时：工具自行通过 ctx 中的取消令牌响应中止。

use std::time::Instant;

use serde_json::Value;

use crate::llm::ToolSpec;
use crate::tools::{ToolContext, ToolOutcome, ToolRegistry};

pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// 执行指定工具并输出 JSON 审计日志
    pub async fn execute(&self, tool_name: &str, args: Value, ctx: &ToolContext) -> ToolOutcome {
        let start = Instant::now();
        let preview = args_preview(&args);
        let outcome = ToolOutcome::from(self.registry.execute(tool_name, args, ctx).await);

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": !outcome.is_error,
            "outcome": if outcome.is_error { "error" } else { "ok" },
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": preview,
            "result_bytes": outcome.text.len(),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        outcome
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.registry.catalog()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

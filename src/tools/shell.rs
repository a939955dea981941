//! Shell 命令工具：交给 ShellSupervisor 前台或后台执行
//!
//! 以完整主机权限运行（不做白名单）；background=true 时只等待短暂宽限期，之后任务在后台继续。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::ShellSupervisor;
use crate::tools::schema::{input_schema, parse_input, require};
use crate::tools::{Tool, ToolContext};

#[derive(Debug, Deserialize, JsonSchema)]
struct ShellInput {
    /// The shell command line to run
    command: String,
    /// Launch the program in the background instead of waiting for it to finish
    #[serde(default)]
    background: bool,
}

pub struct ShellCommandTool {
    supervisor: ShellSupervisor,
}

impl ShellCommandTool {
    pub fn new(supervisor: ShellSupervisor) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl Tool for ShellCommandTool {
    fn name(&self) -> &str {
        "shell_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command on the host and return its combined stdout/stderr output. \
         Set background=true to launch long-running or interactive programs without waiting."
    }

    fn parameters_schema(&self) -> Value {
        input_schema::<ShellInput>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String, String> {
        let input: ShellInput = parse_input(self.name(), args)?;
        require("command", &input.command)?;
        let command = input.command.trim();

        if input.background {
            self.supervisor.run_background(command, &ctx.cancel).await
        } else {
            self.supervisor.run_foreground(command, &ctx.cancel).await
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::ShellSettings;

    fn tool(dir: &std::path::Path) -> ShellCommandTool {
        ShellCommandTool::new(ShellSupervisor::new(ShellSettings {
            capture_dir: dir.to_path_buf(),
            ..ShellSettings::default()
        }))
    }

    #[tokio::test]
    async fn test_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::default();
        let out = tool(dir.path())
            .execute(serde_json::json!({"command": "printf 'a\\nb'"}), &ctx)
            .await;
        assert_eq!(out, Ok("a\nb".to_string()));
    }

    #[tokio::test]
    async fn test_requires_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::default();
        let t = tool(dir.path());
        assert_eq!(
            t.execute(serde_json::json!({}), &ctx).await,
            Err("Missing 'command' parameter".to_string())
        );
        assert_eq!(
            t.execute(serde_json::json!({"command": ""}), &ctx).await,
            Err("Missing 'command' parameter".to_string())
        );
        let err = t
            .execute(serde_json::json!({"command": "true", "background": "yes"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.starts_with("Invalid input for shell_command"), "{err}");
    }
}

//! 核心层：错误类型、所有权交接、轮询钩子、Shell 任务监管

pub mod error;
pub mod handoff;
pub mod poll;
pub mod shell_supervisor;

pub use error::AgentError;
pub use handoff::Handoff;
pub use poll::{NeverAbort, PollHook};
pub use shell_supervisor::{ShellSettings, ShellSupervisor, MAX_TOOL_OUTPUT};

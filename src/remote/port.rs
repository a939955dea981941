//! Agent 命令端点：让其他进程内组件通过远程命令驱动 Agent
//!
//! 命令不区分大小写：ASK / GETLAST / CLEAR / SETMODEL / SETSYSTEM / MEMADD / MEMCLEAR / MEMCOUNT / MEMORY / QUIT。
//! 应答码：0 成功，5 未知命令，10 执行失败。

use crate::agent::Agent;
use crate::remote::{RemoteReply, RemoteRequest};

pub const DEFAULT_PORT_NAME: &str = "COMRADE";

pub const RC_OK: i64 = 0;
pub const RC_UNKNOWN: i64 = 5;
pub const RC_FAILED: i64 = 10;

/// 解析后的端点命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCommand {
    Ask(String),
    GetLast,
    Clear,
    SetModel(String),
    SetSystem(String),
    MemAdd(String),
    MemClear,
    MemCount,
    Memory,
    Quit,
    Unknown,
}

impl PortCommand {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (keyword, rest) = match raw.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim_start()),
            None => (raw, ""),
        };
        let with_arg = |make: fn(String) -> PortCommand| {
            if rest.is_empty() {
                PortCommand::Unknown
            } else {
                make(rest.to_string())
            }
        };
        match keyword.to_ascii_uppercase().as_str() {
            "ASK" => with_arg(PortCommand::Ask),
            "GETLAST" => PortCommand::GetLast,
            "CLEAR" => PortCommand::Clear,
            "SETMODEL" => with_arg(PortCommand::SetModel),
            "SETSYSTEM" => with_arg(PortCommand::SetSystem),
            "MEMADD" => with_arg(PortCommand::MemAdd),
            "MEMCLEAR" => PortCommand::MemClear,
            "MEMCOUNT" => PortCommand::MemCount,
            "MEMORY" => PortCommand::Memory,
            "QUIT" => PortCommand::Quit,
            _ => PortCommand::Unknown,
        }
    }
}

/// 处理完一条命令后，端点循环是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortControl {
    Continue,
    Quit,
}

/// 端点状态：记住最近一次 ASK 的回答
#[derive(Debug, Default)]
pub struct CommandPort {
    last_response: Option<String>,
}

impl CommandPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// 执行请求并应答
    pub async fn handle(&mut self, agent: &mut Agent, request: RemoteRequest) -> PortControl {
        let (reply, control) = self.execute(agent, request.command()).await;
        request.reply(reply);
        control
    }

    pub async fn execute(&mut self, agent: &mut Agent, command: &str) -> (RemoteReply, PortControl) {
        tracing::info!(command = %command, "port: command");
        let reply = match PortCommand::parse(command) {
            PortCommand::Ask(text) => match agent.send(&text).await {
                Ok(answer) => {
                    self.last_response = Some(answer.clone());
                    ok(answer)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "port: ASK failed");
                    failed()
                }
            },
            PortCommand::GetLast => ok(self.last_response.clone().unwrap_or_default()),
            PortCommand::Clear => {
                agent.clear_history();
                self.last_response = None;
                ok("OK")
            }
            PortCommand::SetModel(model) => {
                agent.set_model(model);
                ok("OK")
            }
            PortCommand::SetSystem(prompt) => {
                agent.set_system_prompt(prompt);
                ok("OK")
            }
            PortCommand::MemAdd(text) => match agent.memory_mut() {
                Some(notes) => match notes.add(&text) {
                    Ok(()) => {
                        if let Err(e) = notes.save() {
                            tracing::warn!(error = %e, "port: memory save failed");
                        }
                        ok("OK")
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "port: MEMADD rejected");
                        failed()
                    }
                },
                None => failed(),
            },
            PortCommand::MemClear => {
                if let Some(notes) = agent.memory_mut() {
                    notes.clear();
                    if let Err(e) = notes.save() {
                        tracing::warn!(error = %e, "port: memory save failed");
                    }
                }
                ok("OK")
            }
            PortCommand::MemCount => ok(agent.memory().map_or(0, |m| m.len()).to_string()),
            PortCommand::Memory => ok(agent
                .memory()
                .and_then(|m| m.to_numbered())
                .unwrap_or_else(|| "No memories stored.".to_string())),
            PortCommand::Quit => return (ok("OK"), PortControl::Quit),
            PortCommand::Unknown => RemoteReply::Failure {
                code: RC_UNKNOWN,
                subcode: 0,
            },
        };
        (reply, PortControl::Continue)
    }
}

fn ok(text: impl Into<String>) -> RemoteReply {
    RemoteReply::Success(Some(text.into()))
}

fn failed() -> RemoteReply {
    RemoteReply::Failure {
        code: RC_FAILED,
        subcode: 0,
    }
}

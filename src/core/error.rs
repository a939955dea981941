//! Agent 错误类型
//!
//! 覆盖一次 send 调用可能遇到的全部失败：配置缺失、传输失败、非 2xx、回复无法解析、无文本、取消。
//! 除 MissingApiKey 外，失败时对话已回滚，调用方可直接重发。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（配置、网络、协议、取消）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 未配置 API Key：在任何网络活动之前失败，不修改对话
    #[error("No API key configured")]
    MissingApiKey,

    #[error("HTTPS request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 200 响应体中携带的 error 对象
    #[error("API error: {0}")]
    Api(String),

    #[error("{0}")]
    MalformedReply(String),

    #[error("No text in response")]
    NoText,

    #[error("Request aborted")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),
}

impl AgentError {
    /// 是否可通过重发恢复（回滚已保证对话一致）
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AgentError::MissingApiKey | AgentError::Config(_))
    }
}

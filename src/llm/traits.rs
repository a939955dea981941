//! 传输抽象
//!
//! Agent 只依赖 Transport：把一次 MessagesRequest 发出去并拿回状态码与原始响应体。
//! 可能耗时任意长；取消由调用方在 await 外层用 select 处理。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::MessagesRequest;

/// 原始 HTTP 响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// 网络 / TLS 层失败（未拿到任何 HTTP 响应）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &MessagesRequest) -> Result<TransportResponse, TransportError>;
}

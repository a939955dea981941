//! 远程命令：进程内端点目录 + 请求/应答客户端
//!
//! 端点按名称注册到显式传入的 EndpointDirectory（不使用全局表）；每个请求自带一次性应答通道。
//! 客户端发送后无条件等待唯一的应答，不设超时。

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote endpoint '{0}' not found")]
    EndpointNotFound(String),

    #[error("Remote endpoint '{0}' already registered")]
    DuplicateEndpoint(String),

    #[error("No reply received")]
    NoReply,

    /// 端点以非 0 主码应答；subcode 为数值型次级码
    #[error("Remote error {code}/{subcode}")]
    Failed { code: i64, subcode: i64 },
}

/// 端点的应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteReply {
    Success(Option<String>),
    Failure { code: i64, subcode: i64 },
}

impl RemoteReply {
    /// 主码 0 成功，否则失败（与端点协议一致）
    pub fn from_codes(code: i64, result: Option<String>, subcode: i64) -> Self {
        if code == 0 {
            Self::Success(result)
        } else {
            Self::Failure { code, subcode }
        }
    }
}

/// 投递给端点的请求；reply 消费自身，保证至多应答一次
#[derive(Debug)]
pub struct RemoteRequest {
    command: String,
    reply_to: oneshot::Sender<RemoteReply>,
}

impl RemoteRequest {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn reply(self, reply: RemoteReply) {
        if self.reply_to.send(reply).is_err() {
            tracing::debug!(command = %self.command, "remote: requester went away before reply");
        }
    }
}

type Registry = Arc<RwLock<HashMap<String, mpsc::Sender<RemoteRequest>>>>;

/// 端点目录：名称 → 请求通道。名称区分大小写
#[derive(Clone, Default)]
pub struct EndpointDirectory {
    inner: Registry,
}

impl EndpointDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册端点；返回的 Endpoint 被 drop 时自动注销
    pub fn register(&self, name: &str, capacity: usize) -> Result<Endpoint, RemoteError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(name) {
            return Err(RemoteError::DuplicateEndpoint(name.to_string()));
        }
        let (tx, rx) = mpsc::channel(capacity.max(1));
        map.insert(name.to_string(), tx);
        tracing::info!(endpoint = %name, "remote: endpoint registered");
        Ok(Endpoint {
            name: name.to_string(),
            requests: rx,
            directory: Arc::clone(&self.inner),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<mpsc::Sender<RemoteRequest>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// 已注册端点名（排序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// 已注册的端点：接收请求
pub struct Endpoint {
    name: String,
    requests: mpsc::Receiver<RemoteRequest>,
    directory: Registry,
}

impl Endpoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn recv(&mut self) -> Option<RemoteRequest> {
        self.requests.recv().await
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.directory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
        // 已排队但未处理的请求随之丢弃，等待方收到 NoReply
        self.requests.close();
        while self.requests.try_recv().is_ok() {}
        tracing::info!(endpoint = %self.name, "remote: endpoint unregistered");
    }
}

/// 远程命令客户端
#[derive(Clone)]
pub struct RemoteCommandClient {
    directory: EndpointDirectory,
}

impl RemoteCommandClient {
    pub fn new(directory: EndpointDirectory) -> Self {
        Self { directory }
    }

    /// 发送命令并等待唯一应答。
    ///
    /// 端点不存在立即失败（不重试）；端点持有请求却不应答时，此调用会一直等待。
    pub async fn send(&self, endpoint: &str, command: &str) -> Result<String, RemoteError> {
        let target = self
            .directory
            .lookup(endpoint)
            .ok_or_else(|| RemoteError::EndpointNotFound(endpoint.to_string()))?;

        let (reply_to, reply) = oneshot::channel();
        let request = RemoteRequest {
            command: command.to_string(),
            reply_to,
        };
        tracing::info!(endpoint = %endpoint, command = %command, "remote: send");
        target
            .send(request)
            .await
            .map_err(|_| RemoteError::EndpointNotFound(endpoint.to_string()))?;

        match reply.await {
            Ok(RemoteReply::Success(Some(text))) => Ok(text),
            Ok(RemoteReply::Success(None)) => Ok("OK".to_string()),
            Ok(RemoteReply::Failure { code, subcode }) => Err(RemoteError::Failed { code, subcode }),
            Err(_) => Err(RemoteError::NoReply),
        }
    }
}

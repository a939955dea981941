//! 脚本化传输（用于测试，无需 API）
//!
//! 按入队顺序返回预设响应，并记录收到的每个请求，便于断言 Agent 发出的对话内容。

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{MessagesRequest, Transport, TransportError, TransportResponse};

enum Step {
    Respond(TransportResponse),
    Fail(String),
    /// 永不返回（模拟卡住的网络请求）
    Hang,
}

#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<MessagesRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn enqueue(self, step: Step) -> Self {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
        self
    }

    /// 200 + 任意响应体
    pub fn respond(self, body: impl Into<String>) -> Self {
        self.enqueue(Step::Respond(TransportResponse::ok(body)))
    }

    pub fn respond_status(self, status: u16, body: impl Into<String>) -> Self {
        self.enqueue(Step::Respond(TransportResponse {
            status,
            body: body.into(),
        }))
    }

    /// end_turn + 单个文本块
    pub fn text(self, text: &str) -> Self {
        self.respond(text_reply(text))
    }

    /// tool_use 停止原因 + 若干 tool_use 块：(id, name, input)
    pub fn tool_uses(self, calls: &[(&str, &str, Value)]) -> Self {
        self.respond(tool_use_reply(calls))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.enqueue(Step::Fail(message.into()))
    }

    pub fn hang(self) -> Self {
        self.enqueue(Step::Hang)
    }

    /// 已收到的请求（按顺序）
    pub fn requests(&self) -> Vec<MessagesRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: &MessagesRequest) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let step = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match step {
            Some(Step::Respond(resp)) => Ok(resp),
            Some(Step::Fail(msg)) => Err(TransportError(msg)),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError("script exhausted".to_string())),
        }
    }
}

pub fn text_reply(text: &str) -> String {
    json!({
        "stop_reason": "end_turn",
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 10, "output_tokens": 5}
    })
    .to_string()
}

pub fn tool_use_reply(calls: &[(&str, &str, Value)]) -> String {
    let content: Vec<Value> = calls
        .iter()
        .map(|(id, name, input)| json!({"type": "tool_use", "id": id, "name": name, "input": input}))
        .collect();
    json!({
        "stop_reason": "tool_use",
        "content": content,
        "usage": {"input_tokens": 10, "output_tokens": 5}
    })
    .to_string()
}

//! 短期记忆：对话历史
//!
//! 与远端模型往返的完整消息序列，由 Agent 独占。不做剪枝：tool_use / tool_result 必须成对保留，
//! 失败时只从尾部回滚到调用前的长度。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（与 Messages API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 内容块：按 "type" 字段区分
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "is_false")]
        is_error: bool,
    },
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }
}

/// 消息内容：纯文本或内容块列表（序列化时不带标签，与 API 格式一致）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    /// 模型回复的原样副本：未知块类型（thinking 等）与额外字段（citations 等）都保留
    Raw(Vec<Value>),
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// 原样保存模型返回的 content 数组
    pub fn assistant_raw(blocks: Vec<Value>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Raw(blocks),
        }
    }

    /// 本条消息中所有 tool_use 的 id（按出现顺序）
    pub fn tool_use_ids(&self) -> Vec<&str> {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                    _ => None,
                })
                .collect(),
            MessageContent::Raw(blocks) => raw_ids(blocks, "tool_use", "id"),
            MessageContent::Text(_) => Vec::new(),
        }
    }

    /// 本条消息中所有 tool_result 引用的 id（按出现顺序）
    pub fn tool_result_ids(&self) -> Vec<&str> {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                    _ => None,
                })
                .collect(),
            MessageContent::Raw(blocks) => raw_ids(blocks, "tool_result", "tool_use_id"),
            MessageContent::Text(_) => Vec::new(),
        }
    }
}

fn raw_ids<'a>(blocks: &'a [Value], kind: &str, field: &str) -> Vec<&'a str> {
    blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some(kind))
        .filter_map(|b| b.get(field).and_then(Value::as_str))
        .collect()
}

/// 对话历史
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// 从尾部截断到 len 条，返回移除的条数
    pub fn rollback(&mut self, len: usize) -> usize {
        let removed = self.messages.len().saturating_sub(len);
        self.messages.truncate(len);
        removed
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 每条含 tool_use 的消息，其下一条必须按相同顺序给出全部 tool_result
    pub fn is_consistent(&self) -> bool {
        self.messages.iter().enumerate().all(|(i, msg)| {
            let uses = msg.tool_use_ids();
            if uses.is_empty() {
                return true;
            }
            match self.messages.get(i + 1) {
                Some(next) => next.tool_result_ids() == uses,
                None => false,
            }
        })
    }
}

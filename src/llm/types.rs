//! Messages API 请求类型与默认值

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::Message;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// max_tokens 合法上限；超出范围回退到 DEFAULT_MAX_TOKENS
pub const MAX_TOKENS_LIMIT: u32 = 8192;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const MESSAGES_PATH: &str = "/v1/messages";
pub const API_VERSION: &str = "2023-06-01";

/// 工具目录条目：随每次请求发送
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// 一次 Messages API 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

/// Token 用量（最近一次回复）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// 将配置中的 max_tokens 规范到 1..=MAX_TOKENS_LIMIT
pub fn normalize_max_tokens(value: u32) -> u32 {
    if (1..=MAX_TOKENS_LIMIT).contains(&value) {
        value
    } else {
        DEFAULT_MAX_TOKENS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_empty_optionals() {
        let req = MessagesRequest {
            model: DEFAULT_MODEL.into(),
            max_tokens: 16,
            system: None,
            messages: vec![Message::user("hi")],
            tools: vec![],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": DEFAULT_MODEL,
                "max_tokens": 16,
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn test_normalize_max_tokens() {
        assert_eq!(normalize_max_tokens(0), DEFAULT_MAX_TOKENS);
        assert_eq!(normalize_max_tokens(4096), 4096);
        assert_eq!(normalize_max_tokens(MAX_TOKENS_LIMIT + 1), DEFAULT_MAX_TOKENS);
    }
}

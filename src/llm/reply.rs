//! 回复解析：响应体 → 停止原因、文本、内容块、用量
//!
//! raw 保留 content 数组的原样副本，写入对话历史；content 是其类型化视图，
//! 只用来取文本与 tool_use，未知类型（如 thinking）不进入视图。

use serde_json::Value;

use crate::core::AgentError;
use crate::llm::Usage;
use crate::memory::ContentBlock;

/// 一次回复的解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedReply {
    pub stop_reason: Option<String>,
    /// 所有 text 块以换行拼接；没有文本时为 None
    pub text: Option<String>,
    pub content: Vec<ContentBlock>,
    /// 回复中的全部内容块，未经改动
    pub raw: Vec<Value>,
    pub usage: Usage,
}

impl ParsedReply {
    pub fn wants_tools(&self) -> bool {
        self.stop_reason.as_deref() == Some("tool_use")
    }

    /// 按出现顺序列出 tool_use 块：(id, name, input)
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some((id.as_str(), name.as_str(), input)),
            _ => None,
        })
    }
}

pub fn parse_reply(body: &str) -> Result<ParsedReply, AgentError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|_| AgentError::MalformedReply("Failed to parse JSON response".to_string()))?;

    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        return Err(AgentError::Api(error_message(err).unwrap_or("Unknown API error").to_string()));
    }

    let blocks = value
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| AgentError::MalformedReply("No content in response".to_string()))?;

    let mut content = Vec::with_capacity(blocks.len());
    for raw in blocks {
        match serde_json::from_value::<ContentBlock>(raw.clone()) {
            Ok(ContentBlock::ToolResult { .. }) => {
                tracing::warn!("tool_result block in assistant reply kept verbatim, not interpreted");
            }
            Ok(block) => content.push(block),
            Err(e) => {
                let kind = raw.get("type").and_then(Value::as_str).unwrap_or("<none>");
                tracing::debug!(block_type = kind, error = %e, "reply block kept verbatim, not interpreted");
            }
        }
    }

    let texts: Vec<&str> = content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let text = if texts.is_empty() { None } else { Some(texts.join("\n")) };

    let usage = value
        .get("usage")
        .cloned()
        .and_then(|u| serde_json::from_value(u).ok())
        .unwrap_or_default();

    Ok(ParsedReply {
        stop_reason: value.get("stop_reason").and_then(Value::as_str).map(String::from),
        text,
        content,
        raw: blocks.clone(),
        usage,
    })
}

/// 非 200 响应：取 body 中的 error.message，缺省为 "Request failed"
pub fn http_error(status: u16, body: &str) -> AgentError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(error_message).map(String::from))
        .unwrap_or_else(|| "Request failed".to_string());
    AgentError::Http { status, message }
}

fn error_message(err: &Value) -> Option<&str> {
    err.get("message").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_text_and_tool_use() {
        let body = json!({
            "stop_reason": "tool_use",
            "content": [
                {"type": "text", "text": "Let me look."},
                {"type": "thinking", "thinking": "hmm"},
                {"type": "tool_use", "id": "tu_1", "name": "read_file", "input": {"path": "x"}},
                {"type": "text", "text": "One moment."}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 7}
        })
        .to_string();

        let reply = parse_reply(&body).unwrap();
        assert!(reply.wants_tools());
        assert_eq!(reply.text.as_deref(), Some("Let me look.\nOne moment."));
        assert_eq!(reply.content.len(), 3);
        assert_eq!(reply.raw.len(), 4);
        assert_eq!(reply.raw[1], json!({"type": "thinking", "thinking": "hmm"}));
        let uses: Vec<_> = reply.tool_uses().collect();
        assert_eq!(uses, vec![("tu_1", "read_file", &json!({"path": "x"}))]);
        assert_eq!(reply.usage, Usage { input_tokens: 12, output_tokens: 7 });
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_reply("not json").unwrap_err().to_string(),
            "Failed to parse JSON response"
        );
        assert_eq!(
            parse_reply(r#"{"error": {"type": "overloaded", "message": "Overloaded"}}"#)
                .unwrap_err()
                .to_string(),
            "API error: Overloaded"
        );
        assert_eq!(
            parse_reply(r#"{"error": {}}"#).unwrap_err().to_string(),
            "API error: Unknown API error"
        );
        assert_eq!(
            parse_reply(r#"{"stop_reason": "end_turn"}"#).unwrap_err().to_string(),
            "No content in response"
        );
    }

    #[test]
    fn test_no_text_blocks() {
        let reply = parse_reply(r#"{"stop_reason": "end_turn", "content": []}"#).unwrap();
        assert!(reply.text.is_none());
        assert!(!reply.wants_tools());
        assert_eq!(reply.usage, Usage::default());
    }

    #[test]
    fn test_http_error_message() {
        let err = http_error(401, r#"{"error": {"message": "invalid x-api-key"}}"#);
        assert_eq!(err.to_string(), "HTTP 401: invalid x-api-key");
        let err = http_error(502, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502: Request failed");
    }
}

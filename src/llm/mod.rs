//! LLM 层：传输抽象、Messages API 请求类型、回复解析、HTTPS 实现与脚本化 Mock

pub mod anthropic;
pub mod mock;
pub mod reply;
pub mod traits;
pub mod types;

pub use anthropic::HttpTransport;
pub use mock::ScriptedTransport;
pub use reply::{http_error, parse_reply, ParsedReply};
pub use traits::{Transport, TransportError, TransportResponse};
pub use types::{
    normalize_max_tokens, MessagesRequest, ToolSpec, Usage, API_VERSION, DEFAULT_BASE_URL,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, MAX_TOKENS_LIMIT, MESSAGES_PATH,
};

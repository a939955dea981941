//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `COMRADE__*` 覆盖（双下划线表示嵌套，如 `COMRADE__LLM__MODEL=claude-haiku-4-5`）。
//! API Key 未配置时回退到 `ANTHROPIC_API_KEY`。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::{ShellSettings, MAX_TOOL_OUTPUT};
use crate::llm::{normalize_max_tokens, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::remote::DEFAULT_PORT_NAME;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub memory: MemorySection,
    pub port: PortSection,
}

/// [llm] 段：凭据、模型与请求参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub base_url: String,
    /// 请求/响应体追加写入的日志文件（排查用）
    pub api_log: Option<PathBuf>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_log: None,
        }
    }
}

impl LlmSection {
    /// 配置值优先，空字符串视为未配置，再回退到 ANTHROPIC_API_KEY
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn effective_max_tokens(&self) -> u32 {
        normalize_max_tokens(self.max_tokens)
    }
}

/// [tools] 段：Shell 监管参数、路径
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 后台命令等待快速失败的宽限期（毫秒）
    pub background_grace_ms: u64,
    /// 等待期间检查取消的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// Shell 输出捕获文件目录，未设置时用系统临时目录
    pub capture_dir: Option<PathBuf>,
    /// 工具的相对路径基准与 Shell 工作目录
    pub working_dir: Option<PathBuf>,
    /// 远程端点参考文档目录（<name>.md）
    pub remote_docs_dir: Option<PathBuf>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            background_grace_ms: 500,
            poll_interval_ms: 100,
            capture_dir: None,
            working_dir: None,
            remote_docs_dir: None,
        }
    }
}

impl ToolsSection {
    pub fn shell_settings(&self) -> ShellSettings {
        ShellSettings {
            background_grace: Duration::from_millis(self.background_grace_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            capture_dir: self.capture_dir.clone().unwrap_or_else(std::env::temp_dir),
            working_dir: self.working_dir.clone(),
            max_output: MAX_TOOL_OUTPUT,
        }
    }
}

/// [memory] 段：用户笔记文件，未设置时不持久化
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub path: Option<PathBuf>,
}

/// [port] 段：Agent 自身的命令端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortSection {
    pub name: String,
    pub enabled: bool,
}

impl Default for PortSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_PORT_NAME.to_string(),
            enabled: true,
        }
    }
}

/// 从 config 目录加载配置，环境变量 COMRADE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 COMRADE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("COMRADE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

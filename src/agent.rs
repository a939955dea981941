//! Agent 运行时：多轮 tool-use 循环
//!
//! send 把用户消息加入对话后最多跑 MAX_TOOL_ROUNDS 轮：请求模型 → 记录 assistant 回复 →
//! 若停止原因为 tool_use 则依次执行工具、以一条 user 消息回填全部 tool_result → 继续。
//! 任一轮失败（传输、非 200、回复无法解析、取消）都会把对话回滚到调用前的长度，保证 tool_use / tool_result 成对。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, LlmSection, ToolsSection};
use crate::core::{AgentError, ShellSupervisor};
use crate::events::{ToolEvent, ToolObserver, ToolPhase};
use crate::llm::{http_error, parse_reply, HttpTransport, MessagesRequest, ToolSpec, Transport, Usage};
use crate::memory::{ContentBlock, Conversation, MemoryNotes, Message};
use crate::remote::{EndpointDirectory, RemoteCommandClient};
use crate::scan::SignatureClassifier;
use crate::tools::{
    IdentifyFileTool, ListEndpointsTool, PathBase, ReadFileTool, RemoteCommandTool, ShellCommandTool,
    ToolContext, ToolExecutor, ToolRegistry, WriteFileTool,
};

/// 单次 send 内最多请求模型的轮数
pub const MAX_TOOL_ROUNDS: usize = 10;

/// 观察者摘要的最大字符数
const SUMMARY_CHARS: usize = 200;

/// 请求参数（可在运行时通过命令端点修改 model / system_prompt）
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl AgentSettings {
    pub fn from_config(llm: &LlmSection) -> Self {
        Self {
            api_key: llm.resolved_api_key(),
            model: llm.model.clone(),
            max_tokens: llm.effective_max_tokens(),
            system_prompt: llm.system_prompt.clone(),
        }
    }
}

pub struct Agent {
    settings: AgentSettings,
    conversation: Conversation,
    executor: ToolExecutor,
    catalog: Vec<ToolSpec>,
    transport: Arc<dyn Transport>,
    observer: Option<Arc<dyn ToolObserver>>,
    memory: Option<MemoryNotes>,
    last_usage: Usage,
}

impl Agent {
    pub fn new(settings: AgentSettings, transport: Arc<dyn Transport>, executor: ToolExecutor) -> Self {
        let catalog = executor.catalog();
        Self {
            settings,
            conversation: Conversation::new(),
            executor,
            catalog,
            transport,
            observer: None,
            memory: None,
            last_usage: Usage::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ToolObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_memory(mut self, memory: MemoryNotes) -> Self {
        self.memory = Some(memory);
        self
    }

    /// 发送一条用户消息，返回本次调用累计的回复文本
    pub async fn send(&mut self, text: &str) -> Result<String, AgentError> {
        self.send_cancellable(text, CancellationToken::new()).await
    }

    /// 同 send；cancel 被触发时中止等待中的请求，工具也会收到同一个令牌
    pub async fn send_cancellable(
        &mut self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<String, AgentError> {
        if self.settings.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(AgentError::MissingApiKey);
        }

        let rollback_point = self.conversation.len();
        self.conversation.push(Message::user(text));

        match self.run_rounds(&cancel).await {
            Ok(answer) if answer.is_empty() => Err(AgentError::NoText),
            Ok(answer) => Ok(answer),
            Err(e) => {
                let removed = self.conversation.rollback(rollback_point);
                tracing::warn!(error = %e, removed, "send failed, conversation rolled back");
                Err(e)
            }
        }
    }

    async fn run_rounds(&mut self, cancel: &CancellationToken) -> Result<String, AgentError> {
        let ctx = ToolContext::new(cancel.clone());
        let mut answer = String::new();

        for round in 1..=MAX_TOOL_ROUNDS {
            let request = self.build_request();
            tracing::debug!(round, messages = request.messages.len(), "messages request");

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                r = self.transport.post(&request) => r.map_err(|e| AgentError::Transport(e.0))?,
            };
            if response.status != 200 {
                return Err(http_error(response.status, &response.body));
            }

            let mut reply = parse_reply(&response.body)?;
            self.last_usage = reply.usage;
            if let Some(text) = reply.text.as_deref().filter(|t| !t.is_empty()) {
                if !answer.is_empty() {
                    answer.push('\n');
                }
                answer.push_str(text);
            }
            self.conversation.push(Message::assistant_raw(std::mem::take(&mut reply.raw)));

            if !reply.wants_tools() {
                return Ok(answer);
            }

            let mut results = Vec::new();
            for (id, name, input) in reply.tool_uses() {
                self.notify(name, ToolPhase::Executing, &input.to_string());
                let outcome = self.executor.execute(name, input.clone(), &ctx).await;
                let phase = if outcome.is_error { ToolPhase::Error } else { ToolPhase::Done };
                self.notify(name, phase, &outcome.text);
                results.push(ContentBlock::tool_result(id, outcome.text, outcome.is_error));
            }
            if results.is_empty() {
                // stop_reason 为 tool_use 但没有工具块，按正常结束处理
                return Ok(answer);
            }
            self.conversation.push(Message::user_blocks(results));
        }

        tracing::warn!(rounds = MAX_TOOL_ROUNDS, "tool round limit reached");
        Ok(answer)
    }

    fn build_request(&self) -> MessagesRequest {
        MessagesRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            system: self.system_prompt(),
            messages: self.conversation.messages().to_vec(),
            tools: self.catalog.clone(),
        }
    }

    /// 实际发送的 system prompt：记忆块 + 配置的提示词 + 主机环境说明
    pub fn system_prompt(&self) -> Option<String> {
        let mut prompt = String::new();
        if let Some(block) = self.memory.as_ref().and_then(MemoryNotes::format_block) {
            prompt.push_str(&block);
        }
        prompt.push_str(&self.settings.system_prompt);
        if !self.catalog.is_empty() {
            prompt.push_str(&host_hint());
        }
        if prompt.is_empty() {
            None
        } else {
            Some(prompt)
        }
    }

    fn notify(&self, tool: &str, phase: ToolPhase, detail: &str) {
        if let Some(observer) = &self.observer {
            observer.on_tool_event(&ToolEvent {
                tool: tool.to_string(),
                phase,
                detail: summarize(detail),
            });
        }
    }

    pub fn clear_history(&mut self) {
        self.conversation.clear();
    }

    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.settings.model = model.into();
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.settings.system_prompt = prompt.into();
    }

    /// 最近一次回复的 token 用量
    pub fn last_usage(&self) -> Usage {
        self.last_usage
    }

    pub fn memory(&self) -> Option<&MemoryNotes> {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> Option<&mut MemoryNotes> {
        self.memory.as_mut()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }
}

fn host_hint() -> String {
    format!(
        "\n\nYou are running on the user's {} computer with full access to its shell. \
         You have tools to execute shell commands, send commands to remote command endpoints \
         of running applications, and read/write files. \
         When using identify_file: always set max_results when the user asks for a specific \
         number of files (e.g. 'show 10 images' -> max_results=10). Always set filter when the \
         user asks for a specific file type (e.g. 'images' -> filter='picture').",
        std::env::consts::OS
    )
}

/// 取第一行并截断到 SUMMARY_CHARS 个字符
fn summarize(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > SUMMARY_CHARS {
        format!("{}...", line.chars().take(SUMMARY_CHARS).collect::<String>())
    } else {
        line.to_string()
    }
}

/// 内置工具注册表（注册顺序即工具目录顺序）
pub fn default_registry(tools: &ToolsSection, directory: EndpointDirectory) -> ToolRegistry {
    let paths = PathBase::new(tools.working_dir.clone());
    let mut registry = ToolRegistry::new();
    registry.register(ShellCommandTool::new(ShellSupervisor::new(tools.shell_settings())));
    registry.register(RemoteCommandTool::new(
        RemoteCommandClient::new(directory.clone()),
        tools.remote_docs_dir.clone(),
    ));
    registry.register(ReadFileTool::new(paths.clone()));
    registry.register(WriteFileTool::new(paths.clone()));
    registry.register(ListEndpointsTool::new(directory));
    registry.register(IdentifyFileTool::new(Arc::new(SignatureClassifier), paths));
    registry
}

/// 按配置构建 Agent：HTTPS 传输、内置工具、用户笔记
pub fn create_agent(cfg: &AppConfig, directory: EndpointDirectory) -> Result<Agent, AgentError> {
    let settings = AgentSettings::from_config(&cfg.llm);
    let transport = HttpTransport::new(&cfg.llm.base_url, settings.api_key.clone().unwrap_or_default())
        .with_api_log(cfg.llm.api_log.clone());
    let executor = ToolExecutor::new(default_registry(&cfg.tools, directory));

    let memory = match &cfg.memory.path {
        Some(path) => MemoryNotes::load(path).map_err(|e| AgentError::Config(e.to_string()))?,
        None => MemoryNotes::in_memory(),
    };

    tracing::info!(
        model = %settings.model,
        max_tokens = settings.max_tokens,
        notes = memory.len(),
        "agent created"
    );
    Ok(Agent::new(settings, Arc::new(transport), executor).with_memory(memory))
}

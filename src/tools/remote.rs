//! 远程命令工具：向已注册的端点发送命令并等待应答
//!
//! 首次使用某个端点时，若 docs 目录下有同名参考文档（去掉 .N / _N 实例后缀，小于 8 KiB），
//! 会把文档拼在结果前面，帮助模型掌握该端点的命令集。

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::remote::{RemoteCommandClient, RemoteError};
use crate::tools::schema::{input_schema, parse_input, require};
use crate::tools::{Tool, ToolContext};

/// 参考文档大小上限（字节，不含）
const MAX_DOC_BYTES: u64 = 8 * 1024;

#[derive(Debug, Deserialize, JsonSchema)]
struct RemoteInput {
    /// Name of the remote command endpoint (see list_endpoints)
    endpoint: String,
    /// Command text to send to the endpoint
    command: String,
}

pub struct RemoteCommandTool {
    client: RemoteCommandClient,
    docs_dir: Option<PathBuf>,
    /// 已发送过文档（或确认没有文档）的端点基名，小写
    docs_sent: Mutex<HashSet<String>>,
}

impl RemoteCommandTool {
    pub fn new(client: RemoteCommandClient, docs_dir: Option<PathBuf>) -> Self {
        Self {
            client,
            docs_dir,
            docs_sent: Mutex::new(HashSet::new()),
        }
    }

    /// 首次使用该端点时返回参考文档
    async fn first_use_docs(&self, endpoint: &str) -> Option<String> {
        let base = base_endpoint_name(endpoint);
        let first = self
            .docs_sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(base.to_ascii_lowercase());
        if !first {
            return None;
        }

        let path = self.docs_dir.as_ref()?.join(format!("{}.md", base));
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if meta.len() == 0 || meta.len() >= MAX_DOC_BYTES {
            return None;
        }
        let doc = tokio::fs::read_to_string(&path).await.ok()?;
        tracing::debug!(endpoint = %endpoint, doc = %path.display(), "remote: attaching reference");
        Some(doc)
    }
}

#[async_trait]
impl Tool for RemoteCommandTool {
    fn name(&self) -> &str {
        "remote_command"
    }

    fn description(&self) -> &str {
        "Send a command to a named remote command endpoint of a running application and return its reply. \
         Use list_endpoints to discover available endpoints."
    }

    fn parameters_schema(&self) -> Value {
        input_schema::<RemoteInput>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String, String> {
        let input: RemoteInput = parse_input(self.name(), args)?;
        require("endpoint", &input.endpoint)?;
        require("command", &input.command)?;

        let result = self.client.send(&input.endpoint, &input.command).await;
        if let Err(RemoteError::EndpointNotFound(_)) = &result {
            return result.map_err(|e| e.to_string());
        }
        let result = result.map_err(|e| e.to_string());

        match self.first_use_docs(&input.endpoint).await {
            Some(doc) => {
                let wrap = |text: String| {
                    format!(
                        "--- Reference for {} ---\n{}\n--- Command result ---\n{}",
                        input.endpoint, doc, text
                    )
                };
                result.map(wrap).map_err(wrap)
            }
            None => result,
        }
    }
}

/// 去掉实例后缀：优先 ".N"（VIEWER.1），其次 "_N"（ED_1）
fn base_endpoint_name(name: &str) -> &str {
    let digit_after = |i: usize| name[i + 1..].starts_with(|c: char| c.is_ascii_digit());
    if let Some(i) = name.rfind('.').filter(|&i| digit_after(i)) {
        return &name[..i];
    }
    if let Some(i) = name.rfind('_').filter(|&i| digit_after(i)) {
        return &name[..i];
    }
    name
}

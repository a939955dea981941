//! 文件读写工具
//!
//! 相对路径基于配置的工作目录解析（未配置时为进程当前目录）；不做沙箱限制。
//! 结果消息中的路径保持模型给出的原样。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use crate::core::MAX_TOOL_OUTPUT;
use crate::tools::schema::{input_schema, parse_input, require};
use crate::tools::{Tool, ToolContext};

/// read_file 返回内容上限
pub const MAX_READ_BYTES: usize = MAX_TOOL_OUTPUT - 64;

/// 路径解析：绝对路径原样使用，相对路径拼到 base 下
#[derive(Debug, Clone, Default)]
pub struct PathBase {
    base: Option<PathBuf>,
}

impl PathBase {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        match &self.base {
            Some(base) if p.is_relative() => base.join(p),
            _ => p.to_path_buf(),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadInput {
    /// Path of the file to read
    path: String,
}

pub struct ReadFileTool {
    paths: PathBase,
}

impl ReadFileTool {
    pub fn new(paths: PathBase) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file. Large files are truncated."
    }

    fn parameters_schema(&self) -> Value {
        input_schema::<ReadInput>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String, String> {
        let input: ReadInput = parse_input(self.name(), args)?;
        require("path", &input.path)?;
        tracing::info!(path = %input.path, "read_file");

        let cannot_open = || format!("Cannot open file: {}", input.path);
        let file = tokio::fs::File::open(self.paths.resolve(&input.path))
            .await
            .map_err(|_| cannot_open())?;
        let mut buf = Vec::new();
        file.take(MAX_READ_BYTES as u64)
            .read_to_end(&mut buf)
            .await
            .map_err(|_| cannot_open())?;

        if buf.is_empty() {
            return Ok("(empty file)".to_string());
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WriteInput {
    /// Path of the file to create or overwrite
    path: String,
    /// Full text content to write
    content: String,
}

pub struct WriteFileTool {
    paths: PathBase,
}

impl WriteFileTool {
    pub fn new(paths: PathBase) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file with the given text content."
    }

    fn parameters_schema(&self) -> Value {
        input_schema::<WriteInput>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String, String> {
        let input: WriteInput = parse_input(self.name(), args)?;
        require("path", &input.path)?;
        tracing::info!(path = %input.path, bytes = input.content.len(), "write_file");

        tokio::fs::write(self.paths.resolve(&input.path), input.content.as_bytes())
            .await
            .map_err(|_| format!("Cannot create file: {}", input.path))?;
        Ok(format!("Wrote {} bytes to {}", input.content.len(), input.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let base = PathBase::new(Some(dir.path().to_path_buf()));
        let ctx = ToolContext::default();

        let wrote = WriteFileTool::new(base.clone())
            .execute(json!({"path": "note.txt", "content": "héllo"}), &ctx)
            .await;
        assert_eq!(wrote, Ok("Wrote 6 bytes to note.txt".to_string()));

        let read = ReadFileTool::new(base).execute(json!({"path": "note.txt"}), &ctx).await;
        assert_eq!(read, Ok("héllo".to_string()));
    }

    #[tokio::test]
    async fn test_read_edge_cases() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty"), "").unwrap();
        std::fs::write(dir.path().join("big"), "z".repeat(MAX_TOOL_OUTPUT * 2)).unwrap();
        let tool = ReadFileTool::new(PathBase::new(Some(dir.path().to_path_buf())));
        let ctx = ToolContext::default();

        assert_eq!(
            tool.execute(json!({"path": "missing"}), &ctx).await,
            Err("Cannot open file: missing".to_string())
        );
        assert_eq!(
            tool.execute(json!({"path": "empty"}), &ctx).await,
            Ok("(empty file)".to_string())
        );
        assert_eq!(
            tool.execute(json!({"path": "big"}), &ctx).await.unwrap().len(),
            MAX_READ_BYTES
        );
        assert_eq!(
            tool.execute(json!({"path": ""}), &ctx).await,
            Err("Missing 'path' parameter".to_string())
        );
    }

    #[tokio::test]
    async fn test_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(PathBase::new(Some(dir.path().to_path_buf())));
        let ctx = ToolContext::default();
        assert_eq!(
            tool.execute(json!({"path": "no/such/dir/f.txt", "content": "x"}), &ctx).await,
            Err("Cannot create file: no/such/dir/f.txt".to_string())
        );
        assert_eq!(
            tool.execute(json!({"path": "f.txt"}), &ctx).await,
            Err("Missing 'content' parameter".to_string())
        );
        assert_eq!(
            tool.execute(json!({"path": "blank.txt", "content": ""}), &ctx).await,
            Ok("Wrote 0 bytes to blank.txt".to_string())
        );
    }
}

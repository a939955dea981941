//! 列出当前可用的远程命令端点

use async_trait::async_trait;
use serde_json::Value;

use crate::remote::EndpointDirectory;
use crate::tools::{Tool, ToolContext};

pub struct ListEndpointsTool {
    directory: EndpointDirectory,
}

impl ListEndpointsTool {
    pub fn new(directory: EndpointDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for ListEndpointsTool {
    fn name(&self) -> &str {
        "list_endpoints"
    }

    fn description(&self) -> &str {
        "List the names of all remote command endpoints currently registered."
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<String, String> {
        let names = self.directory.names();
        if names.is_empty() {
            return Ok("(no public endpoints found)".to_string());
        }
        Ok(names.join("\n"))
    }
}

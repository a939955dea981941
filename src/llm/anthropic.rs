//! Messages API 的 HTTPS 传输（reqwest）
//!
//! POST {base_url}/v1/messages，携带 x-api-key 与 anthropic-version 头；
//! 可选把请求/响应体追加写入日志文件，便于排查协议问题。

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::llm::{MessagesRequest, Transport, TransportError, TransportResponse, API_VERSION, MESSAGES_PATH};

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_log: Option<PathBuf>,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), MESSAGES_PATH),
            api_key: api_key.into(),
            api_log: None,
        }
    }

    pub fn with_api_log(mut self, path: Option<PathBuf>) -> Self {
        self.api_log = path;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn log(&self, header: &str, body: &str) {
        let Some(path) = &self.api_log else {
            return;
        };
        let entry = format!(
            "==== {} {} ====\n{}\n\n",
            header,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            body
        );
        let written = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(entry.as_bytes()).await
        }
        .await;
        if let Err(e) = written {
            tracing::debug!(path = %path.display(), error = %e, "api log write failed");
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &MessagesRequest) -> Result<TransportResponse, TransportError> {
        let payload = serde_json::to_string(request)
            .map_err(|e| TransportError(format!("Failed to build request JSON: {}", e)))?;
        self.log("REQUEST", &payload).await;

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        self.log(&format!("RESPONSE {}", status), &body).await;

        tracing::debug!(status, bytes = body.len(), "messages api response");
        Ok(TransportResponse { status, body })
    }
}

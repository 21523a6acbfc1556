use std::time::Duration;

use futures_util::stream::Stream;

use super::stream::{consume_snapshots, snapshot_stream, CancellationToken, StreamOutcome};
use crate::config::AIConfig;
use crate::errors::AIError;
use crate::types::ai::{ChatMessage, OpenAIChatRequest};

/// Streaming client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: AIConfig,
}

impl ChatClient {
    pub fn new(config: &AIConfig) -> Result<Self, AIError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn request(&self, messages: Vec<ChatMessage>) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.config.model_name.clone(),
            messages,
            temperature: self.config.temperature,
            stream: true,
        }
    }

    /// Send the request and return the cumulative snapshot stream.
    pub async fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<impl Stream<Item = Result<String, AIError>>, AIError> {
        let request_payload = self.request(messages);

        if let Ok(json_string) = serde_json::to_string_pretty(&request_payload) {
            tracing::debug!(
                "正在发送流式请求到 AI:\n{}",
                json_string.chars().take(500).collect::<String>()
            );
        } else {
            tracing::warn!("序列化 AI 请求数据用于调试失败。");
        }

        let mut request_builder = self.http.post(&self.config.api_url);
        if let Some(api_key) = &self.config.api_key {
            tracing::debug!("正在使用 API 密钥进行请求");
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder
            .json(&request_payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("发送 AI 请求失败: {}", e);
                AIError::RequestFailed(e)
            })?;

        if !response.status().is_success() {
            let status_code = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body from AI response".to_string());
            tracing::error!("AI API 请求失败，状态码: {}: {}", status_code, body);
            return Err(AIError::ApiResponseError(status_code, body));
        }

        Ok(snapshot_stream(Box::pin(response.bytes_stream())))
    }

    /// Stream a completion, calling `render` with every new snapshot.
    ///
    /// Cancellation is honoured both while connecting and while streaming.
    pub async fn complete<F>(
        &self,
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
        render: F,
    ) -> Result<StreamOutcome, AIError>
    where
        F: FnMut(&str),
    {
        let snapshots = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("请求在建立连接前被取消");
                return Ok(StreamOutcome::Cancelled(String::new()));
            }
            snapshots = self.stream(messages) => snapshots?,
        };

        let outcome = consume_snapshots(snapshots, cancel, render).await?;
        if let StreamOutcome::Completed(text) = &outcome {
            if text.trim().is_empty() {
                tracing::warn!("AI 返回了空的消息内容。");
                return Err(AIError::EmptyMessage);
            }
        }
        Ok(outcome)
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::error::AgentError;
use crate::stream::{SseDecoder, StreamAssembler, StreamChunk};

/// A single reasoning request: one system prompt framing the role, one
/// user prompt carrying the datasets.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Correlates log lines across retries of the same logical call.
    pub request_id: Uuid,
}

impl EngineRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Streaming reasoning backend. Implementations return the reply as a
/// chunk stream; use [`complete`] to get the assembled text.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn submit(
        &self,
        request: &EngineRequest,
    ) -> Result<BoxStream<'static, Result<StreamChunk, AgentError>>, AgentError>;
}

/// Submits `request` and assembles the full reply text.
pub async fn complete(
    engine: &Arc<dyn ReasoningEngine>,
    request: &EngineRequest,
) -> Result<String, AgentError> {
    let stream = engine.submit(request).await?;
    StreamAssembler::assemble(stream).await
}

/// Reasoning engine over an OpenAI-compatible chat completions endpoint.
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpEngine {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Engine(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ReasoningEngine for HttpEngine {
    async fn submit(
        &self,
        request: &EngineRequest,
    ) -> Result<BoxStream<'static, Result<StreamChunk, AgentError>>, AgentError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "response_format": { "type": "json_object" },
            "stream": true,
        });

        debug!(request_id = %request.request_id, model = %self.model, "Submitting engine request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Engine(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Engine(format!(
                "engine returned {status}: {detail}"
            )));
        }

        let chunks = response
            .bytes_stream()
            .map(|item| item.map_err(|e| AgentError::Engine(format!("stream read failed: {e}"))))
            .scan(SseDecoder::new(), |decoder, item| {
                let out: Vec<Result<StreamChunk, AgentError>> = match item {
                    Ok(bytes) => decoder.feed(&bytes).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                futures_util::future::ready(Some(futures_util::stream::iter(out)))
            })
            .flatten()
            .boxed();

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedEngine;

    #[tokio::test]
    async fn complete_assembles_scripted_reply() {
        let engine = ScriptedEngine::with_reply("{\"signal\":\"neutral\"}");
        let engine: Arc<dyn ReasoningEngine> = Arc::new(engine);

        let request = EngineRequest::new("system", "user");
        let reply = complete(&engine, &request).await.unwrap();
        assert_eq!(reply, "{\"signal\":\"neutral\"}");
    }

    #[tokio::test]
    async fn complete_reports_truncated_reply() {
        let engine = ScriptedEngine::new(vec![vec![StreamChunk::content("{\"sig")]]);
        let engine: Arc<dyn ReasoningEngine> = Arc::new(engine);

        let request = EngineRequest::new("system", "user");
        let err = complete(&engine, &request).await.unwrap_err();
        assert!(matches!(err, AgentError::StreamIncomplete));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let engine = HttpEngine::new(
            "https://api.example.com/",
            "test-model",
            "key",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(engine.base_url, "https://api.example.com");
    }
}

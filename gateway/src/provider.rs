//! The reasoning-model provider abstraction: given a transcript and a tool
//! catalog, return one assistant choice.
//!
//! Grounded on the teacher's `LlmClient` trait (`loom/src/llm/mod.rs`), widened
//! here to carry the tool catalog into the call and to return a finish reason
//! so the chat loop can tell "plain answer" apart from "wants to call a tool".

use crate::error::GatewayError;
use crate::message::ChatMessage;
use crate::tool_source::ToolSpec;
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

#[derive(Clone, Debug)]
pub struct ProviderChoice {
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
}

/// One turn against a reasoning-model backend: messages and tools in, one
/// choice out. Implementations: [`OpenAiProvider`] (real API), `MockProvider`
/// (fixed scripted responses, used in tests).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ProviderChoice, GatewayError>;
}

/// An OpenAI-compatible chat completions endpoint, following the request shape
/// the teacher's SSE adapter speaks (`loom/src/openai_sse/request.rs`) but used
/// here non-streaming: one request, one parsed choice.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(serde::Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool<'a>>,
}

#[derive(serde::Serialize)]
struct OpenAiTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAiFunction<'a>,
}

#[derive(serde::Serialize)]
struct OpenAiFunction<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    parameters: &'a serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<RawChoice>,
}

#[derive(serde::Deserialize)]
struct RawChoice {
    message: RawMessage,
    finish_reason: String,
}

#[derive(serde::Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
}

#[derive(serde::Deserialize)]
struct RawToolCall {
    id: String,
    function: RawFunctionCall,
}

#[derive(serde::Deserialize)]
struct RawFunctionCall {
    name: String,
    arguments: String,
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ProviderChoice, GatewayError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            tools: tools
                .iter()
                .map(|t| OpenAiTool {
                    kind: "function",
                    function: OpenAiFunction {
                        name: &t.name,
                        description: t.description.as_deref(),
                        parameters: &t.input_schema,
                    },
                })
                .collect(),
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Provider(format!("{status}: {text}")));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        let choice = parsed.choices.into_iter().next().ok_or(GatewayError::NoChoices)?;

        let tool_calls: Vec<crate::message::ToolCallRequest> = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| crate::message::ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let finish_reason = if !tool_calls.is_empty() || choice.finish_reason == "tool_calls" {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };

        let message = ChatMessage::assistant(choice.message.content.unwrap_or_default(), tool_calls);

        Ok(ProviderChoice { message, finish_reason })
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use tokio::sync::Mutex;

    /// A provider that replays a fixed script of choices, one per call, for
    /// exercising the chat loop without a network dependency.
    pub struct MockProvider {
        script: Mutex<std::collections::VecDeque<ProviderChoice>>,
    }

    impl MockProvider {
        pub fn new(script: Vec<ProviderChoice>) -> Self {
            Self { script: Mutex::new(script.into()) }
        }
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<ProviderChoice, GatewayError> {
            self.script.lock().await.pop_front().ok_or(GatewayError::NoChoices)
        }
    }
}

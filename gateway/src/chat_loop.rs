//! The reasoning loop: alternate between asking the provider for a choice and,
//! when it asks for a tool, invoking that tool and feeding the result back.
//!
//! 1. Send the current transcript and tool catalog to the provider.
//! 2. If the returned choice's finish reason is not `tool_calls`, stop and
//!    return the transcript plus that choice.
//! 3. Otherwise take the first tool call, append the assistant message that
//!    requested it, invoke the named tool, append a tool message carrying the
//!    result (or the error, stringified), and go to 1.

use crate::error::GatewayError;
use crate::extract_json::extract_json_object;
use crate::message::ChatMessage;
use crate::provider::{FinishReason, ModelProvider};
use crate::tool_source::ToolTransport;
use serde_json::Value;

/// Caps runaway tool-call chains (a provider that never stops calling tools).
const MAX_TURNS: usize = 32;

pub async fn run_chat_loop(
    provider: &dyn ModelProvider,
    tools: &dyn ToolTransport,
    mut messages: Vec<ChatMessage>,
) -> Result<(Vec<ChatMessage>, ChatMessage), GatewayError> {
    let tool_specs = tools.list_tools().await?;

    for _ in 0..MAX_TURNS {
        let choice = provider.complete(&messages, &tool_specs).await?;

        if choice.finish_reason != FinishReason::ToolCalls {
            return Ok((messages, choice.message));
        }

        let Some(call) = choice.message.tool_calls.clone().unwrap_or_default().into_iter().next() else {
            return Ok((messages, choice.message));
        };

        messages.push(choice.message);

        let arguments: Value = extract_json_object(&call.arguments)
            .ok_or_else(|| GatewayError::UnparsableArguments(call.arguments.clone()))?;

        let result = match tools.call_tool(&call.name, arguments).await {
            Ok(output) => output,
            Err(e) => format!("error: {e}"),
        };

        messages.push(ChatMessage::tool(call.id, result));
    }

    Err(GatewayError::Provider(format!(
        "exceeded {MAX_TURNS} tool-call turns without a final answer"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Content, ToolCallRequest};
    use crate::provider::mock::MockProvider;
    use crate::provider::ProviderChoice;
    use crate::tool_source::ToolSpec;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl ToolTransport for EchoTool {
        async fn list_tools(&self) -> Result<Vec<ToolSpec>, GatewayError> {
            Ok(vec![ToolSpec {
                name: "echo".into(),
                description: Some("echoes its input".into()),
                input_schema: serde_json::json!({"type": "object"}),
            }])
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, GatewayError> {
            assert_eq!(name, "echo");
            Ok(arguments["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn returns_immediately_when_no_tool_call_is_requested() {
        let provider = MockProvider::new(vec![ProviderChoice {
            message: ChatMessage::assistant("hi there", vec![]),
            finish_reason: FinishReason::Stop,
        }]);
        let (messages, final_message) =
            run_chat_loop(&provider, &EchoTool, vec![ChatMessage::user(Content::Text("hello".into()))])
                .await
                .unwrap();
        assert_eq!(final_message.text(), "hi there");
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn invokes_tool_then_returns_final_answer() {
        let provider = MockProvider::new(vec![
            ProviderChoice {
                message: ChatMessage::assistant(
                    "",
                    vec![ToolCallRequest {
                        id: "call_1".into(),
                        name: "echo".into(),
                        arguments: "here: {\"text\": \"ping\"} thanks".into(),
                    }],
                ),
                finish_reason: FinishReason::ToolCalls,
            },
            ProviderChoice {
                message: ChatMessage::assistant("the tool said ping", vec![]),
                finish_reason: FinishReason::Stop,
            },
        ]);

        let (messages, final_message) =
            run_chat_loop(&provider, &EchoTool, vec![ChatMessage::user(Content::Text("hello".into()))])
                .await
                .unwrap();

        assert_eq!(final_message.text(), "the tool said ping");
        // user, assistant(tool call), tool(result)
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, "tool");
        assert_eq!(messages[2].text(), "ping");
    }

    #[tokio::test]
    async fn unparsable_tool_arguments_surface_as_an_error() {
        let provider = MockProvider::new(vec![ProviderChoice {
            message: ChatMessage::assistant(
                "",
                vec![ToolCallRequest {
                    id: "call_1".into(),
                    name: "echo".into(),
                    arguments: "not json at all".into(),
                }],
            ),
            finish_reason: FinishReason::ToolCalls,
        }]);

        let err = run_chat_loop(&provider, &EchoTool, vec![ChatMessage::user(Content::Text("hello".into()))])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnparsableArguments(_)));
    }
}

//! A single callable tool, and a registry that aggregates many of them behind
//! one [`ToolTransport`].
//!
//! Grounded on the teacher's `Tool` trait (`loom/src/tools/trait.rs`) and its
//! `AggregateToolSource`/`ToolRegistry` pairing: individual tools are written
//! once, registered by name, and exposed to the chat loop as a single
//! transport that lists and dispatches by name.

use crate::error::GatewayError;
use crate::tool_source::{ToolSpec, ToolTransport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// A single tool the reasoning model may call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn spec(&self) -> ToolSpec;
    async fn call(&self, args: Value) -> Result<String, GatewayError>;
}

/// Aggregates named tools behind one [`ToolTransport`], dispatching
/// `call_tool` by name and rejecting calls to anything not registered.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }
}

#[async_trait]
impl ToolTransport for ToolRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, GatewayError> {
        Ok(self.tools.values().map(|t| t.spec()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, GatewayError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| GatewayError::Transport(format!("no such tool: {name}")))?;
        tool.call(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn spec(&self) -> ToolSpec {
            ToolSpec { name: "echo".into(), description: None, input_schema: serde_json::json!({}) }
        }

        async fn call(&self, args: Value) -> Result<String, GatewayError> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn registered_tool_is_listed_and_callable() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let specs = registry.list_tools().await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");

        let out = registry.call_tool("echo", serde_json::json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn calling_an_unregistered_tool_is_a_transport_error() {
        let registry = ToolRegistry::new();
        let err = registry.call_tool("nope", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}

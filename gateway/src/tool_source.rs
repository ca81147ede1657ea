//! The tool transport the gateway opens to discover and invoke tools.
//!
//! Grounded on the teacher's `ToolSource` trait (`loom/src/tool_source/mcp/mod.rs`):
//! `list_tools` maps to `tools/list`, `call_tool` to `tools/call`. Here the trait is
//! generic over transport — an in-process peer-invocation tool set (C5) and an MCP
//! transport both implement it.

use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// A transport the gateway opens once per chat loop to enumerate and call tools.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, GatewayError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, GatewayError>;
}

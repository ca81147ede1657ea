//! Uniform adapter over one reasoning-model provider: multi-turn chat,
//! tool advertisement, and the tool-call loop.
//!
//! Grounded on the teacher's `loom/src/llm` (provider abstraction) and
//! `loom/src/tool_source/mcp` (tool transport) modules, generalized so an
//! in-process peer-invocation tool set can sit behind the same
//! [`ToolTransport`] seam as a real MCP connection.

pub mod chat_loop;
pub mod error;
pub mod extract_json;
pub mod message;
pub mod provider;
pub mod tool;
pub mod tool_source;

pub use chat_loop::run_chat_loop;
pub use error::GatewayError;
pub use extract_json::extract_json_object;
pub use message::{ChatMessage, Content, ContentPart, ImageUrl, InputAudio, ToolCallRequest};
pub use provider::{FinishReason, ModelProvider, OpenAiProvider, ProviderChoice};
pub use tool::{Tool, ToolRegistry};
pub use tool_source::{ToolSpec, ToolTransport};

//! Provider-facing chat transcript types.
//!
//! Distinct from `protocol::Message` (the fabric's wire message): these are the
//! records the gateway actually sends to the reasoning-model provider, following
//! the OpenAI-compatible shape the teacher's SSE adapter parses
//! (`loom/src/openai_sse/request.rs`) — `content` is either a string or an array
//! of typed content-parts so multimodal input passes through unchanged.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: "system".into(), content: Content::Text(text.into()), tool_call_id: None, tool_calls: None }
    }

    pub fn user(content: Content) -> Self {
        Self { role: "user".into(), content, tool_call_id: None, tool_calls: None }
    }

    pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: "assistant".into(),
            content: Content::Text(text.into()),
            tool_call_id: None,
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        }
    }

    pub fn tool(call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: "tool".into(),
            content: Content::Text(text.into()),
            tool_call_id: Some(call_id.into()),
            tool_calls: None,
        }
    }

    pub fn text(&self) -> String {
        self.content.as_text()
    }
}

/// Message content: a plain string, or a list of multimodal content-parts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    pub fn as_text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// One part of a multimodal message (OpenAI-compatible `type` tag).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio: Option<InputAudio>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self { part_type: "text".into(), text: Some(text.into()), image_url: None, input_audio: None }
    }

    pub fn image_data_url(mime_type: &str, base64_data: &str) -> Self {
        Self {
            part_type: "image_url".into(),
            text: None,
            image_url: Some(ImageUrl { url: format!("data:{mime_type};base64,{base64_data}") }),
            input_audio: None,
        }
    }

    pub fn input_audio(base64_data: &str, format: &str) -> Self {
        Self {
            part_type: "input_audio".into(),
            text: None,
            image_url: None,
            input_audio: Some(InputAudio { data: base64_data.to_string(), format: format.to_string() }),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputAudio {
    pub data: String,
    pub format: String,
}

/// A tool call requested by the provider for the current assistant turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Raw arguments text as returned by the provider; may contain extra prose
    /// around the JSON body — use [`crate::extract_json::extract_json_object`].
    pub arguments: String,
}

//! The `/user/chat` entry point: the system's own planner, driving C2 with a
//! user-scoped peer-invocation tool pair (C5) exactly as a worker would, but
//! living inside C4's process and talking to the graph directly.
//!
//! Grounded on `net_simulator/nodes/system_server.py`'s `user_chat` handler
//! and `executor_base.py`'s content-building for an incoming message.

use std::sync::Arc;

use agent::peer_tools::{self, Role};
use filestore::FileStore;
use gateway::{ChatMessage, Content, ContentPart, ModelProvider};
use protocol::{ContextId, FilePayload, Message, Part};

use crate::error::RegistryError;
use crate::graph::Graph;
use crate::local_client::LocalRegistryClient;

pub async fn user_chat(
    graph: Arc<Graph>,
    filestore: Arc<FileStore>,
    provider: Arc<dyn ModelProvider>,
    planner_system_prompt: &str,
    user_id: &str,
    context_id: ContextId,
    parts: Vec<Part>,
) -> Result<String, RegistryError> {
    let history = graph.user_conversation(user_id, &context_id).await?;

    let content_parts = resolve_parts(&filestore, &parts)?;
    let user_message = Message::user(parts).with_context(context_id.clone());

    let mut transcript = vec![ChatMessage::system(planner_system_prompt)];
    transcript.extend(history.iter().map(to_chat_message));
    transcript.push(ChatMessage::user(Content::Parts(content_parts)));

    let registry_client = Arc::new(LocalRegistryClient::new(graph.clone()));
    let tools = peer_tools::build_peer_tools(user_id.to_string(), Role::User, registry_client, filestore);

    let (_, final_message) = gateway::run_chat_loop(provider.as_ref(), &tools, transcript).await?;
    let reply_text = final_message.text();

    let assistant_message = Message::assistant_text(reply_text.clone()).with_context(context_id.clone());
    graph.append_to_conversation(user_id, &context_id, vec![user_message, assistant_message]).await?;

    Ok(reply_text)
}

/// Mirrors `GenericAgentRuntime::resolve_parts_to_content`: mints a fresh
/// `FileId` for inline uploads and injects a synthetic "the ID of this file
/// is …" text part so the planner can hand that ID to `agent_send_message`.
fn resolve_parts(filestore: &FileStore, parts: &[Part]) -> Result<Vec<ContentPart>, RegistryError> {
    let mut content = Vec::new();
    let text = protocol::concat_text_parts(parts);
    if !text.is_empty() {
        content.push(ContentPart::text(text));
    }

    for part in parts {
        let Part::File { mime_type, payload } = part else { continue };
        let (file_id, bytes) = match payload {
            FilePayload::Ref { file_id } => {
                let record = filestore.get(file_id).map_err(|e| RegistryError::NotFound(e.to_string()))?;
                (file_id.clone(), record.bytes)
            }
            FilePayload::Inline { bytes } => {
                let file_id = filestore.put(bytes.clone(), mime_type.clone()).map_err(|e| RegistryError::InvalidInput(e.to_string()))?;
                (file_id, bytes.clone())
            }
        };
        content.push(multimodal_content_part(mime_type, &bytes));
        content.push(ContentPart::text(format!("the ID of this file is {file_id}")));
    }

    Ok(content)
}

fn multimodal_content_part(mime_type: &str, bytes: &[u8]) -> ContentPart {
    use base64::{engine::general_purpose::STANDARD, Engine};
    let encoded = STANDARD.encode(bytes);
    if mime_type.starts_with("image/") {
        ContentPart::image_data_url(mime_type, &encoded)
    } else if mime_type.starts_with("audio/") {
        let format = mime_type.split('/').nth(1).unwrap_or("wav");
        ContentPart::input_audio(&encoded, format)
    } else {
        ContentPart::text(format!("[attached file, mime_type={mime_type}, base64 below]\n{encoded}"))
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    let text = message.text();
    match message.role {
        protocol::Role::User => ChatMessage::user(Content::Text(text)),
        protocol::Role::Assistant => ChatMessage::assistant(text, vec![]),
        protocol::Role::System => ChatMessage::system(text),
        protocol::Role::Tool => ChatMessage::tool(message.message_id.to_string(), text),
    }
}

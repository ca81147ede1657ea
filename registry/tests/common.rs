//! Shared test harness: spins up a worker agent on a real bound
//! `TcpListener`, exactly as `agentd` does, so tests exercise the genuine
//! HTTP hop the peer-invocation tools take. Grounded on the teacher's
//! `serve/tests/e2e/common.rs` (`spawn_server_once` pattern).

use std::sync::Arc;

use agent::registry_client::RegistryClient;
use agent::runtime::{GenericAgentRuntime, RuntimeConfig};
use async_trait::async_trait;
use gateway::provider::mock::MockProvider;
use gateway::{ChatMessage, FinishReason, GatewayError, ModelProvider, ProviderChoice, ToolSpec};
use protocol::AgentId;
use registry::graph::Graph;
use tokio::sync::Mutex;

pub struct Worker {
    pub agent_id: AgentId,
    pub url: String,
    // Keeps the worker's on-disk file store alive for the test's duration.
    _filestore_dir: tempfile::TempDir,
}

/// Registers a worker in `graph` and serves it on a freshly bound port,
/// scripted with `script` (one `ProviderChoice` per call the planner forces
/// it to make).
pub async fn spawn_worker(graph: Arc<Graph>, name: &str, category: &str, script: Vec<ProviderChoice>) -> Worker {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{addr}");

    let registry: Arc<dyn RegistryClient> = Arc::new(registry::local_client::LocalRegistryClient::new(graph.clone()));
    let filestore_dir = tempfile::tempdir().unwrap();
    let filestore = Arc::new(filestore::FileStore::open(filestore_dir.path()).unwrap());

    let runtime = Arc::new(GenericAgentRuntime::new(RuntimeConfig {
        name: name.to_string(),
        category: category.to_string(),
        description: format!("{name} test worker"),
        system_prompt: "you are a test worker".into(),
        supported_media_types: vec!["text/plain".into(), "image/png".into()],
        skills: vec![],
        self_url: url.clone(),
        registry: registry.clone(),
        filestore,
        provider: Arc::new(MockProvider::new(script)),
        extra_tools: vec![],
    }));

    let agent_id = graph.register(name.to_string(), url.clone(), category.to_string(), true, None).await.unwrap();
    runtime.set_agent_id(agent_id.clone());

    let app = agent::app::router(runtime);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Worker { agent_id, url, _filestore_dir: filestore_dir }
}

/// A single-choice script: the worker answers immediately with `text` and no
/// tool calls.
pub fn answers_with(text: &str) -> Vec<ProviderChoice> {
    vec![ProviderChoice { message: gateway::ChatMessage::assistant(text, vec![]), finish_reason: FinishReason::Stop }]
}

/// A two-turn script for the planner: call `agent_send_message` against
/// `worker_url` with `parts_json`, then answer with `final_text`.
pub fn calls_agent_send_message(worker_url: &str, parts_json: &str, final_text: &str) -> Vec<ProviderChoice> {
    let arguments = format!(r#"{{"agent_url": "{worker_url}", "parts": {parts_json}}}"#);
    vec![
        ProviderChoice {
            message: gateway::ChatMessage::assistant(
                "",
                vec![gateway::ToolCallRequest { id: "call_1".into(), name: "agent_send_message".into(), arguments }],
            ),
            finish_reason: FinishReason::ToolCalls,
        },
        ProviderChoice { message: gateway::ChatMessage::assistant(final_text, vec![]), finish_reason: FinishReason::Stop },
    ]
}

/// A [`MockProvider`] that also records every transcript it was handed, so a
/// test can inspect what content actually reached the "model" — e.g. that a
/// file round-trip carried the right bytes.
pub struct RecordingProvider {
    script: Mutex<std::collections::VecDeque<ProviderChoice>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingProvider {
    pub fn new(script: Vec<ProviderChoice>) -> Self {
        Self { script: Mutex::new(script.into()), calls: Mutex::new(Vec::new()) }
    }

    pub async fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for RecordingProvider {
    async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ProviderChoice, GatewayError> {
        self.calls.lock().await.push(messages.to_vec());
        self.script.lock().await.pop_front().ok_or(GatewayError::NoChoices)
    }
}

/// A planner stand-in for the file round-trip scenario: the real id minted
/// for an inline upload isn't known until `user_chat` runs, so this provider
/// reads it back out of its own first turn's transcript instead of replaying
/// a fixed script.
pub struct FileIdEchoProvider {
    worker_url: String,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FileIdEchoProvider {
    pub fn new(worker_url: String) -> Self {
        Self { worker_url, calls: Mutex::new(Vec::new()) }
    }

    pub async fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for FileIdEchoProvider {
    async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ProviderChoice, GatewayError> {
        let mut calls = self.calls.lock().await;
        calls.push(messages.to_vec());
        let turn = calls.len();
        drop(calls);

        if turn > 1 {
            return Ok(ProviderChoice { message: ChatMessage::assistant("got it", vec![]), finish_reason: FinishReason::Stop });
        }

        let marker = "the ID of this file is ";
        let file_id = messages
            .iter()
            .find_map(|m| match &m.content {
                gateway::Content::Parts(parts) => parts.iter().find_map(|p| p.text.as_ref()?.strip_prefix(marker)),
                gateway::Content::Text(_) => None,
            })
            .expect("transcript must carry the synthetic file-id text")
            .to_string();

        let arguments = serde_json::json!({
            "agent_url": self.worker_url,
            "parts": [
                {"kind": "text", "text": "describe"},
                {"kind": "file", "mime_type": "image/png", "payload": {"file_id": file_id}},
            ],
        })
        .to_string();

        Ok(ProviderChoice {
            message: ChatMessage::assistant(
                "",
                vec![gateway::ToolCallRequest { id: "call_1".into(), name: "agent_send_message".into(), arguments }],
            ),
            finish_reason: FinishReason::ToolCalls,
        })
    }
}

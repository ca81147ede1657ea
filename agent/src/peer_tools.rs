//! The two peer-invocation tools (C5): `agent_discover` and
//! `agent_send_message`. Exposed to the gateway as plain [`gateway::Tool`]
//! impls registered into a [`gateway::ToolRegistry`] scoped to one identity,
//! grounded on `net_simulator/mcp/agent_service.py`'s `AgentService` (the
//! `FastMCP` tool pair running, in spirit, as in-process functions wired
//! through MCP — we keep the trait seam and skip the subprocess hop).

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use gateway::{GatewayError, Tool, ToolRegistry, ToolSpec};
use protocol::{AgentCard, AgentId, ContextId, FilePayload, Part, Task, TaskEvent, TaskId};
use serde::Deserialize;
use serde_json::Value;

use crate::registry_client::RegistryClient;

/// Whether the tool set is scoped to a worker agent or a user chat session.
/// Both use the same streaming send path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Agent,
    User,
}

/// Builds the peer-invocation tool pair for one identity and registers them
/// into a fresh [`ToolRegistry`], ready to hand to the chat loop.
pub fn build_peer_tools(
    self_id: String,
    role: Role,
    registry: Arc<dyn RegistryClient>,
    filestore: Arc<filestore::FileStore>,
) -> ToolRegistry {
    let mut registry_tools = ToolRegistry::new();
    let shared = Arc::new(PeerContext { self_id, role, registry, filestore, http: reqwest::Client::new() });
    registry_tools.register(Box::new(AgentDiscoverTool { ctx: shared.clone() }));
    registry_tools.register(Box::new(AgentSendMessageTool { ctx: shared }));
    registry_tools
}

struct PeerContext {
    self_id: String,
    #[allow(dead_code)]
    role: Role,
    registry: Arc<dyn RegistryClient>,
    filestore: Arc<filestore::FileStore>,
    http: reqwest::Client,
}

struct AgentDiscoverTool {
    ctx: Arc<PeerContext>,
}

#[derive(serde::Serialize)]
struct DiscoverEntry {
    url: String,
    name: String,
    card: AgentCard,
}

#[async_trait]
impl Tool for AgentDiscoverTool {
    fn name(&self) -> &str {
        "agent_discover"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "agent_discover".into(),
            description: Some(
                "Discover all agents visible to you in the agent network. Returns a JSON \
                 list describing each agent's URL, name, and agent card (skills, capabilities)."
                    .into(),
            ),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    async fn call(&self, _args: Value) -> Result<String, GatewayError> {
        let agents = self
            .ctx
            .registry
            .discover(&AgentId::from(self.ctx.self_id.as_str()))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let mut entries = Vec::with_capacity(agents.len());
        for agent in agents {
            let card: AgentCard = self
                .ctx
                .http
                .get(format!("{}/agent-card", agent.url))
                .send()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?
                .json()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            entries.push(DiscoverEntry { url: agent.url, name: agent.name, card });
        }

        serde_json::to_string(&entries).map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

struct AgentSendMessageTool {
    ctx: Arc<PeerContext>,
}

#[derive(Deserialize)]
struct SendMessageArgs {
    agent_url: String,
    parts: Vec<Part>,
    #[serde(default)]
    task_id: Option<TaskId>,
    #[serde(default)]
    context_id: Option<ContextId>,
}

#[async_trait]
impl Tool for AgentSendMessageTool {
    fn name(&self) -> &str {
        "agent_send_message"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "agent_send_message".into(),
            description: Some(AGENT_SEND_MESSAGE_DESCRIPTION.into()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "agent_url": {"type": "string", "description": "URL of the agent to send the message to, from agent_discover"},
                    "parts": {"type": "array", "description": "TextPart/FilePart content to send"},
                    "task_id": {"type": ["string", "null"], "description": "continue an existing task, or omit for a new one"},
                    "context_id": {"type": ["string", "null"], "description": "associate with an existing context, or omit for a new one"}
                },
                "required": ["agent_url", "parts"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String, GatewayError> {
        let args: SendMessageArgs = serde_json::from_value(args)
            .map_err(|e| GatewayError::Transport(format!("invalid agent_send_message arguments: {e}")))?;

        let target = self.resolve_target(&args.agent_url).await?;

        self.ctx
            .registry
            .add_interaction(&AgentId::from(self.ctx.self_id.as_str()), &target, &protocol::concat_text_parts(&args.parts))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let outcome = self.send_and_forward(args, &target).await;

        let _ = self.ctx.registry.delete_interaction(&AgentId::from(self.ctx.self_id.as_str()), &target).await;

        outcome
    }
}

const AGENT_SEND_MESSAGE_DESCRIPTION: &str = "Send a message to an agent at `agent_url` (obtained from agent_discover). \
`parts` is a list of TextPart/FilePart content. To continue a multi-turn task whose last reply asked for more \
input, pass its `task_id` back; omit it to start a new task. A FilePart's payload is a file-store id: files you \
were told about (by a user or another agent) can be referenced this way without re-uploading their bytes. \
This call may take a while; it returns the destination's final task once its run completes.";

impl AgentSendMessageTool {
    async fn resolve_target(&self, agent_url: &str) -> Result<AgentId, GatewayError> {
        let agents = self
            .ctx
            .registry
            .discover(&AgentId::from(self.ctx.self_id.as_str()))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        agents
            .into_iter()
            .find(|a| a.url == agent_url)
            .map(|a| a.agent_id)
            .ok_or_else(|| GatewayError::Transport(format!("agent with URL {agent_url} not found in the registry")))
    }

    async fn send_and_forward(&self, args: SendMessageArgs, _target: &AgentId) -> Result<String, GatewayError> {
        let mut parts = Vec::with_capacity(args.parts.len());
        for part in args.parts {
            parts.push(self.inline_file_refs(part).await?);
        }

        let body = serde_json::json!({
            "parts": parts,
            "task_id": args.task_id,
            "context_id": args.context_id,
        });

        let resp = self
            .ctx
            .http
            .post(format!("{}/send_message_streaming", args.agent_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let mut task_id: Option<TaskId> = None;
        let mut stream = resp.bytes_stream();
        let mut buf = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| GatewayError::Transport(e.to_string()))?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(idx) = buf.find("\n\n") {
                let frame: String = buf.drain(..idx + 2).collect();
                let Some(data) = frame.strip_prefix("data: ") else { continue };
                let event: TaskEvent = serde_json::from_str(data.trim())
                    .map_err(|e| GatewayError::Transport(format!("malformed task event: {e}")))?;
                task_id = Some(self.forward_event(&event).await?);
            }
        }

        let task_id = task_id.ok_or_else(|| GatewayError::Transport("destination sent no task events".into()))?;

        let task: Task = self
            .ctx
            .http
            .get(format!("{}/tasks/{}", args.agent_url, task_id))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        serde_json::to_string(&task).map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn forward_event(&self, event: &TaskEvent) -> Result<TaskId, GatewayError> {
        let observer = &self.ctx.self_id;
        let task_id = match event {
            TaskEvent::Task(task) => {
                self.ctx.registry.post_task_event(observer, task).await.map_err(|e| GatewayError::Transport(e.to_string()))?;
                task.id.clone()
            }
            TaskEvent::Status(status) => {
                self.ctx
                    .registry
                    .post_task_status_event(observer, status)
                    .await
                    .map_err(|e| GatewayError::Transport(e.to_string()))?;
                status.task_id.clone()
            }
            TaskEvent::Artifact(artifact) => {
                self.ctx
                    .registry
                    .post_task_artifact_event(observer, artifact)
                    .await
                    .map_err(|e| GatewayError::Transport(e.to_string()))?;
                artifact.task_id.clone()
            }
        };
        Ok(task_id)
    }

    async fn inline_file_refs(&self, part: Part) -> Result<Part, GatewayError> {
        match part {
            Part::File { payload: FilePayload::Ref { file_id }, .. } => {
                let record = self.ctx.filestore.get(&file_id).map_err(|e| GatewayError::Transport(e.to_string()))?;
                Ok(Part::file_inline(record.media_type, record.bytes))
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::registry_client::DiscoveredAgent;
    use protocol::{TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRegistry {
        agents: Vec<DiscoveredAgent>,
        interactions_added: Mutex<Vec<(AgentId, AgentId)>>,
        interactions_deleted: Mutex<Vec<(AgentId, AgentId)>>,
        forwarded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RegistryClient for FakeRegistry {
        async fn register(&self, _req: crate::registry_client::RegisterRequest) -> Result<AgentId, RuntimeError> {
            unimplemented!()
        }
        async fn keepalive(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            unimplemented!()
        }
        async fn unregister(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            unimplemented!()
        }
        async fn discover(&self, _agent_id: &AgentId) -> Result<Vec<DiscoveredAgent>, RuntimeError> {
            Ok(self.agents.clone())
        }
        async fn add_interaction(&self, src: &AgentId, dst: &AgentId, _message: &str) -> Result<(), RuntimeError> {
            self.interactions_added.lock().unwrap().push((src.clone(), dst.clone()));
            Ok(())
        }
        async fn delete_interaction(&self, src: &AgentId, dst: &AgentId) -> Result<(), RuntimeError> {
            self.interactions_deleted.lock().unwrap().push((src.clone(), dst.clone()));
            Ok(())
        }
        async fn task_count_add(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn task_count_delete(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn post_task_event(&self, _observer_id: &str, task: &Task) -> Result<(), RuntimeError> {
            self.forwarded.lock().unwrap().push(format!("task:{}", task.id));
            Ok(())
        }
        async fn post_task_status_event(&self, _observer_id: &str, event: &TaskStatusUpdateEvent) -> Result<(), RuntimeError> {
            self.forwarded.lock().unwrap().push(format!("status:{:?}", event.state));
            Ok(())
        }
        async fn post_task_artifact_event(&self, _observer_id: &str, event: &TaskArtifactUpdateEvent) -> Result<(), RuntimeError> {
            self.forwarded.lock().unwrap().push(format!("artifact:{}", event.name));
            Ok(())
        }
    }

    #[tokio::test]
    async fn resolve_target_fails_clearly_when_url_unknown() {
        let registry: Arc<dyn RegistryClient> = Arc::new(FakeRegistry { agents: vec![], ..Default::default() });
        let dir = tempfile::tempdir().unwrap();
        let fs = Arc::new(filestore::FileStore::open(dir.path()).unwrap());
        let ctx = PeerContext {
            self_id: "self1".into(),
            role: Role::Agent,
            registry,
            filestore: fs,
            http: reqwest::Client::new(),
        };
        let tool = AgentSendMessageTool { ctx: Arc::new(ctx) };
        let err = tool.resolve_target("http://nope").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn send_message_tool_always_deletes_interaction_even_on_failure() {
        let registry = Arc::new(FakeRegistry {
            agents: vec![DiscoveredAgent {
                agent_id: AgentId::from("peer1"),
                name: "peer".into(),
                url: "http://127.0.0.1:0/unreachable".into(),
            }],
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let fs = Arc::new(filestore::FileStore::open(dir.path()).unwrap());
        let ctx = Arc::new(PeerContext {
            self_id: "self1".into(),
            role: Role::Agent,
            registry: registry.clone() as Arc<dyn RegistryClient>,
            filestore: fs,
            http: reqwest::Client::new(),
        });
        let tool = AgentSendMessageTool { ctx };

        let args = serde_json::json!({
            "agent_url": "http://127.0.0.1:0/unreachable",
            "parts": [{"kind": "text", "text": "hi"}],
        });
        let err = tool.call(args).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));

        assert_eq!(registry.interactions_added.lock().unwrap().len(), 1);
        assert_eq!(registry.interactions_deleted.lock().unwrap().len(), 1);
    }
}

//! `GenericAgentRuntime`: the task state machine shared by every worker
//! personality (Design Notes §9 point 1 — personality is configuration, not
//! a subclass). Grounded on `executor_base.py`'s per-task transcript map and
//! `system_server.py`'s transition logging, ported to `tracing` spans.

use std::collections::HashMap;
use std::sync::Arc;

use gateway::{ChatMessage, Content, ContentPart, ModelProvider, Tool, ToolRegistry, ToolSpec};
use protocol::{
    AgentCard, ArtifactId, Capabilities, ContextId, FilePayload, Message, Part, Skill, Task,
    TaskArtifactUpdateEvent, TaskId, TaskState, TaskStatusUpdateEvent,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::peer_tools;
use crate::registry_client::RegistryClient;

/// A marker an agent's reasoning prompt may use to signal that the user's
/// input was insufficient; the runtime treats a final answer beginning with
/// it as `input_required` instead of `completed`. Documented here rather
/// than hardcoded in any one personality's prompt, since prompts stay opaque
/// configuration (spec.md §1 out-of-scope list).
pub const NEEDS_INPUT_MARKER: &str = "NEEDS_INPUT:";

/// One streaming update forwarded both to the local task record and (by the
/// caller) to the registry's event store.
#[derive(Clone, Debug)]
pub enum RuntimeEvent {
    Task(Task),
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
}

/// Per-task transcript entry: the provider-facing chat messages accumulated
/// across turns, keyed by `TaskId` so multi-turn resumption appends rather
/// than starting over.
struct Transcript {
    messages: Vec<ChatMessage>,
}

/// A single worker, parametrized entirely by configuration: name, category,
/// system prompt, accepted media types, and any extra tool transports beyond
/// the two peer-invocation tools every runtime carries. Covers every
/// specialist the source modeled as a distinct executor subclass.
pub struct GenericAgentRuntime {
    pub name: String,
    pub category: String,
    pub description: String,
    pub system_prompt: String,
    pub supported_media_types: Vec<String>,
    pub skills: Vec<Skill>,
    pub self_url: String,

    pub(crate) registry: Arc<dyn RegistryClient>,
    pub(crate) filestore: Arc<filestore::FileStore>,
    provider: Arc<dyn ModelProvider>,
    extra_tools: Vec<Arc<dyn Tool>>,

    agent_id: std::sync::Mutex<Option<protocol::AgentId>>,
    transcripts: Mutex<HashMap<TaskId, Transcript>>,
    tasks: Mutex<HashMap<TaskId, Task>>,
}

pub struct RuntimeConfig {
    pub name: String,
    pub category: String,
    pub description: String,
    pub system_prompt: String,
    pub supported_media_types: Vec<String>,
    pub skills: Vec<Skill>,
    pub self_url: String,
    pub registry: Arc<dyn RegistryClient>,
    pub filestore: Arc<filestore::FileStore>,
    pub provider: Arc<dyn ModelProvider>,
    pub extra_tools: Vec<Arc<dyn Tool>>,
}

impl GenericAgentRuntime {
    pub fn new(cfg: RuntimeConfig) -> Self {
        Self {
            name: cfg.name,
            category: cfg.category,
            description: cfg.description,
            system_prompt: cfg.system_prompt,
            supported_media_types: cfg.supported_media_types,
            skills: cfg.skills,
            self_url: cfg.self_url,
            registry: cfg.registry,
            filestore: cfg.filestore,
            provider: cfg.provider,
            extra_tools: cfg.extra_tools,
            agent_id: std::sync::Mutex::new(None),
            transcripts: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn card(&self) -> AgentCard {
        AgentCard {
            name: self.name.clone(),
            description: self.description.clone(),
            url: self.self_url.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capabilities: Capabilities { streaming: true },
            skills: self.skills.clone(),
            default_input_modes: vec!["text".into()],
            default_output_modes: vec!["text".into()],
        }
    }

    pub fn set_agent_id(&self, id: protocol::AgentId) {
        *self.agent_id.lock().expect("agent id lock poisoned") = Some(id);
    }

    pub fn agent_id(&self) -> Option<protocol::AgentId> {
        self.agent_id.lock().expect("agent id lock poisoned").clone()
    }

    pub async fn get_task(&self, task_id: &TaskId) -> Option<Task> {
        self.tasks.lock().await.get(task_id).cloned()
    }

    /// Drives the full task lifecycle for one incoming message, emitting a
    /// [`RuntimeEvent`] on `events` at every transition. Mirrors the state
    /// machine in spec.md §4.3: submitted → working → (artifact*, status?) →
    /// completed/failed, with `/task_count/{add,delete}` bracketing the run.
    pub async fn process_message(
        &self,
        parts: Vec<Part>,
        task_id: Option<TaskId>,
        context_id: Option<ContextId>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Result<TaskId, RuntimeError> {
        let now = now_secs();
        let (task_id, context_id, is_resume) = self.start_or_resume_task(task_id, context_id, now, &events).await?;

        let agent_id = self.agent_id();
        if let Some(agent_id) = &agent_id {
            self.registry.task_count_add(agent_id).await?;
        }

        let outcome = self
            .run_turn(&task_id, &context_id, parts, is_resume, &events)
            .await;

        if let Some(agent_id) = &agent_id {
            self.registry.task_count_delete(agent_id).await?;
        }

        if let Err(e) = &outcome {
            self.fail_task(&task_id, e.to_string(), &events).await;
        }

        Ok(task_id)
    }

    async fn start_or_resume_task(
        &self,
        task_id: Option<TaskId>,
        context_id: Option<ContextId>,
        now: u64,
        events: &mpsc::Sender<RuntimeEvent>,
    ) -> Result<(TaskId, ContextId, bool), RuntimeError> {
        if let Some(task_id) = task_id {
            let mut tasks = self.tasks.lock().await;
            if let Some(existing) = tasks.get(&task_id) {
                if existing.state.is_terminal() {
                    return Err(RuntimeError::Peer(format!("task {task_id} is already terminal")));
                }
                return Ok((task_id, existing.context_id.clone(), true));
            }
            // Caller referenced a task this runtime never created: start fresh under that id.
            // `ContextId::new` must run, not `Default` (empty string) — unwrap_or_default would be wrong.
            #[allow(clippy::unwrap_or_default)]
            let context_id = context_id.unwrap_or_else(ContextId::new);
            let task = Task::new_submitted(task_id.clone(), context_id.clone(), now);
            tasks.insert(task_id.clone(), task.clone());
            drop(tasks);
            let _ = events.send(RuntimeEvent::Task(task)).await;
            return Ok((task_id, context_id, false));
        }

        let task_id = TaskId::new();
        #[allow(clippy::unwrap_or_default)]
        let context_id = context_id.unwrap_or_else(ContextId::new);
        let task = Task::new_submitted(task_id.clone(), context_id.clone(), now);
        self.tasks.lock().await.insert(task_id.clone(), task.clone());
        let _ = events.send(RuntimeEvent::Task(task)).await;
        Ok((task_id, context_id, false))
    }

    async fn run_turn(
        &self,
        task_id: &TaskId,
        context_id: &ContextId,
        parts: Vec<Part>,
        is_resume: bool,
        events: &mpsc::Sender<RuntimeEvent>,
    ) -> Result<(), RuntimeError> {
        self.transition(task_id, TaskState::Working, None, events).await;
        info!(task_id = %task_id, agent = %self.name, resumed = is_resume, "task working");

        let content_parts = self.resolve_parts_to_content(parts.clone()).await?;

        let mut transcripts = self.transcripts.lock().await;
        let transcript = transcripts.entry(task_id.clone()).or_insert_with(|| Transcript {
            messages: vec![ChatMessage::system(self.system_prompt.clone())],
        });
        transcript.messages.push(ChatMessage::user(Content::Parts(content_parts)));
        let messages = transcript.messages.clone();
        drop(transcripts);

        let tools = self.build_tools();
        let (updated_messages, final_message) = gateway::run_chat_loop(self.provider.as_ref(), &tools, messages)
            .await
            .map_err(RuntimeError::Gateway)?;

        self.transcripts.lock().await.insert(task_id.clone(), Transcript { messages: updated_messages });

        let final_text = final_message.text();
        let user_message = Message::user(parts).with_task(task_id.clone()).with_context(context_id.clone());

        if let Some(remainder) = final_text.strip_prefix(NEEDS_INPUT_MARKER) {
            self.transition(
                task_id,
                TaskState::InputRequired,
                Some(Message::assistant_text(remainder.trim()).with_task(task_id.clone())),
                events,
            )
            .await;
            let _ = user_message; // excerpt retained for symmetry with the completed path
            return Ok(());
        }

        let artifact_id = ArtifactId::new();
        let artifact_event = TaskArtifactUpdateEvent {
            task_id: task_id.clone(),
            artifact_id,
            name: format!("{} response", self.name),
            parts: vec![Part::text(final_text.clone())],
            append: false,
            last_chunk: true,
        };
        self.apply_artifact(task_id, &artifact_event).await;
        let _ = events.send(RuntimeEvent::Artifact(artifact_event)).await;

        self.transition(
            task_id,
            TaskState::Completed,
            Some(Message::assistant_text(final_text).with_task(task_id.clone())),
            events,
        )
        .await;

        Ok(())
    }

    async fn fail_task(&self, task_id: &TaskId, error: String, events: &mpsc::Sender<RuntimeEvent>) {
        warn!(task_id = %task_id, agent = %self.name, error = %error, "task failed");
        self.transition(
            task_id,
            TaskState::Failed,
            Some(Message::assistant_text(error).with_task(task_id.clone())),
            events,
        )
        .await;
    }

    async fn transition(
        &self,
        task_id: &TaskId,
        state: TaskState,
        message: Option<Message>,
        events: &mpsc::Sender<RuntimeEvent>,
    ) {
        {
            let mut tasks = self.tasks.lock().await;
            if let Some(task) = tasks.get_mut(task_id) {
                task.apply_status(state, message.clone());
            }
        }
        let event = TaskStatusUpdateEvent { task_id: task_id.clone(), state, message };
        let _ = events.send(RuntimeEvent::Status(event)).await;
    }

    async fn apply_artifact(&self, task_id: &TaskId, event: &TaskArtifactUpdateEvent) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.apply_artifact(event.artifact_id.clone(), event.name.clone(), event.parts.clone(), event.append);
        }
    }

    /// Resolves each `Part` into a provider-facing content-part, minting a
    /// fresh `FileId` for inline uploads (so downstream agents can
    /// re-reference by id) and fetching bytes for existing references. Fails
    /// `working → failed` if a referenced file is unknown or its media type
    /// is unsupported per configuration.
    async fn resolve_parts_to_content(&self, parts: Vec<Part>) -> Result<Vec<ContentPart>, RuntimeError> {
        let mut content = Vec::new();
        let text = protocol::concat_text_parts(&parts);
        if !text.is_empty() {
            content.push(ContentPart::text(text));
        }

        for part in parts {
            let Part::File { mime_type, payload } = part else { continue };
            if !self.supported_media_types.is_empty() && !self.supported_media_types.iter().any(|m| m == &mime_type) {
                return Err(RuntimeError::UnsupportedMedia(mime_type));
            }

            let (file_id, bytes) = match payload {
                FilePayload::Ref { file_id } => {
                    let record = self.filestore.get(&file_id)?;
                    (file_id, record.bytes)
                }
                FilePayload::Inline { bytes } => {
                    let file_id = self.filestore.put(bytes.clone(), mime_type.clone())?;
                    (file_id, bytes)
                }
            };

            content.push(multimodal_content_part(&mime_type, &bytes));
            content.push(ContentPart::text(format!("the ID of this file is {file_id}")));
        }

        Ok(content)
    }

    fn build_tools(&self) -> ToolRegistry {
        let self_id = self.agent_id().map(|id| id.to_string()).unwrap_or_default();
        let mut registry =
            peer_tools::build_peer_tools(self_id, peer_tools::Role::Agent, self.registry.clone(), self.filestore.clone());
        for tool in &self.extra_tools {
            registry.register(Box::new(ClonedTool(tool.clone())));
        }
        registry
    }
}

struct ClonedTool(Arc<dyn Tool>);

#[async_trait::async_trait]
impl Tool for ClonedTool {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn spec(&self) -> ToolSpec {
        self.0.spec()
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, gateway::GatewayError> {
        self.0.call(args).await
    }
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

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry_client::DiscoveredAgent;
    use async_trait::async_trait;
    use gateway::provider::mock::MockProvider;
    use gateway::{FinishReason, ProviderChoice};
    use protocol::{AgentId, TaskArtifactUpdateEvent as Artifact, TaskStatusUpdateEvent as Status};

    #[derive(Default)]
    struct NoopRegistry;

    #[async_trait]
    impl RegistryClient for NoopRegistry {
        async fn register(&self, _req: crate::registry_client::RegisterRequest) -> Result<AgentId, RuntimeError> {
            Ok(AgentId::new())
        }
        async fn keepalive(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn unregister(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn discover(&self, _agent_id: &AgentId) -> Result<Vec<DiscoveredAgent>, RuntimeError> {
            Ok(vec![])
        }
        async fn add_interaction(&self, _src: &AgentId, _dst: &AgentId, _message: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn delete_interaction(&self, _src: &AgentId, _dst: &AgentId) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn task_count_add(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn task_count_delete(&self, _agent_id: &AgentId) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn post_task_event(&self, _observer_id: &str, _task: &Task) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn post_task_status_event(&self, _observer_id: &str, _event: &Status) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn post_task_artifact_event(&self, _observer_id: &str, _event: &Artifact) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    fn runtime_with(provider: MockProvider) -> GenericAgentRuntime {
        let dir = tempfile::tempdir().unwrap();
        GenericAgentRuntime::new(RuntimeConfig {
            name: "tester".into(),
            category: "X".into(),
            description: "a test agent".into(),
            system_prompt: "be helpful".into(),
            supported_media_types: vec![],
            skills: vec![],
            self_url: "http://agent.test".into(),
            registry: Arc::new(NoopRegistry),
            filestore: Arc::new(filestore::FileStore::open(dir.path()).unwrap()),
            provider: Arc::new(provider),
            extra_tools: vec![],
        })
    }

    #[tokio::test]
    async fn completes_a_fresh_task_and_produces_one_artifact() {
        let provider = MockProvider::new(vec![ProviderChoice {
            message: ChatMessage::assistant("all done", vec![]),
            finish_reason: FinishReason::Stop,
        }]);
        let runtime = runtime_with(provider);
        let (tx, mut rx) = mpsc::channel(16);

        let task_id = runtime
            .process_message(vec![Part::text("hello")], None, None, tx)
            .await
            .unwrap();

        let task = runtime.get_task(&task_id).await.unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.artifacts.len(), 1);
        assert_eq!(task.artifacts[0].name, "tester response");

        let mut saw_completed = false;
        while let Ok(ev) = rx.try_recv() {
            if let RuntimeEvent::Status(s) = ev {
                if s.state == TaskState::Completed {
                    saw_completed = true;
                }
            }
        }
        assert!(saw_completed);
    }

    #[tokio::test]
    async fn needs_input_marker_enters_input_required_without_an_artifact() {
        let provider = MockProvider::new(vec![ProviderChoice {
            message: ChatMessage::assistant(format!("{NEEDS_INPUT_MARKER} which file?"), vec![]),
            finish_reason: FinishReason::Stop,
        }]);
        let runtime = runtime_with(provider);
        let (tx, _rx) = mpsc::channel(16);

        let task_id = runtime
            .process_message(vec![Part::text("describe")], None, None, tx)
            .await
            .unwrap();

        let task = runtime.get_task(&task_id).await.unwrap();
        assert_eq!(task.state, TaskState::InputRequired);
        assert!(task.artifacts.is_empty());
    }

    #[tokio::test]
    async fn resuming_a_terminal_task_fails_instead_of_mutating_it() {
        let provider = MockProvider::new(vec![ProviderChoice {
            message: ChatMessage::assistant("done", vec![]),
            finish_reason: FinishReason::Stop,
        }]);
        let runtime = runtime_with(provider);
        let (tx, _rx) = mpsc::channel(16);
        let task_id = runtime
            .process_message(vec![Part::text("hello")], None, None, tx.clone())
            .await
            .unwrap();

        let err = runtime
            .process_message(vec![Part::text("again")], Some(task_id), None, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Peer(_)));
    }

    #[tokio::test]
    async fn unsupported_media_type_fails_the_task() {
        let provider = MockProvider::new(vec![ProviderChoice {
            message: ChatMessage::assistant("unused", vec![]),
            finish_reason: FinishReason::Stop,
        }]);
        let mut runtime = runtime_with(provider);
        runtime.supported_media_types = vec!["text/plain".into()];
        let (tx, mut rx) = mpsc::channel(16);

        let task_id = runtime
            .process_message(vec![Part::file_inline("image/png", vec![1, 2, 3])], None, None, tx)
            .await
            .unwrap();

        let task = runtime.get_task(&task_id).await.unwrap();
        assert_eq!(task.state, TaskState::Failed);
        let mut saw_failed = false;
        while let Ok(ev) = rx.try_recv() {
            if let RuntimeEvent::Status(s) = ev {
                if s.state == TaskState::Failed {
                    saw_failed = true;
                }
            }
        }
        assert!(saw_failed);
    }
}

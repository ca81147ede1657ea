//! The single shared graph: agent registration, keep-alive eviction,
//! visibility-scoped discovery, interaction edges, task counters, the
//! task/artifact event store, and user sessions.
//!
//! Grounded on `net_simulator/nodes/system_server.py`'s in-memory node map,
//! restructured around `protocol::AgentNode`/`AgentKind` and guarded by a
//! single `tokio::sync::Mutex` per spec.md §5's single-writer discipline.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use agent::registry_client::DiscoveredAgent;
use protocol::{
    is_visible, AgentId, AgentKind, AgentNode, Artifact, ContextId, Interaction, Message, Task,
    TaskArtifactUpdateEvent, TaskId, TaskStatusUpdateEvent,
};
use tokio::sync::Mutex;

use crate::error::RegistryError;

pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// The graph is keyed by a plain string id space shared between `AgentId` and
/// `UserId` — both are just random (or, for users, caller-chosen) hex
/// strings, and spec.md's `map<AgentId, AgentNode>` does not distinguish the
/// two spaces at the storage layer, only by `AgentNode::kind`.
pub struct Graph {
    nodes: Mutex<HashMap<String, AgentNode>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self { nodes: Mutex::new(HashMap::new()) }
    }

    pub async fn register(
        &self,
        name: String,
        url: String,
        category: String,
        expose: bool,
        visible_to: Option<Vec<String>>,
    ) -> Result<AgentId, RegistryError> {
        let mut nodes = self.nodes.lock().await;
        if nodes.values().any(|n| matches!(&n.kind, AgentKind::Public { url: u, .. } if u == &url)) {
            return Err(RegistryError::AlreadyExists(format!("agent already registered at url {url}")));
        }
        let id = AgentId::new();
        let node = AgentNode::new_public(name, category, url, now_secs(), expose, visible_to);
        nodes.insert(id.as_str().to_string(), node);
        Ok(id)
    }

    pub async fn keepalive(&self, agent_id: &AgentId) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        let node = nodes
            .get_mut(agent_id.as_str())
            .ok_or_else(|| RegistryError::NotFound(format!("agent {agent_id} not registered")))?;
        match &mut node.kind {
            AgentKind::Public { last_seen, .. } => {
                *last_seen = now_secs();
                Ok(())
            }
            AgentKind::User { .. } => Err(RegistryError::InvalidRole(format!("{agent_id} is not a public agent"))),
        }
    }

    pub async fn unregister(&self, agent_id: &AgentId) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        nodes
            .remove(agent_id.as_str())
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(format!("agent {agent_id} not registered")))
    }

    pub async fn discover(&self, agent_id: &AgentId) -> Result<Vec<DiscoveredAgent>, RegistryError> {
        let nodes = self.nodes.lock().await;
        let requester = nodes
            .get(agent_id.as_str())
            .ok_or_else(|| RegistryError::NotFound(format!("agent {agent_id} not registered")))?;
        let category = requester.category.clone();
        Ok(nodes
            .iter()
            .filter(|(_, n)| n.is_public() && is_visible(&category, n))
            .map(|(id, n)| {
                let AgentKind::Public { url, .. } = &n.kind else { unreachable!() };
                DiscoveredAgent { agent_id: AgentId::from(id.as_str()), name: n.name.clone(), url: url.clone() }
            })
            .collect())
    }

    /// All public agents regardless of visibility — for operators, not runtimes.
    pub async fn get_all(&self) -> Vec<DiscoveredAgent> {
        let nodes = self.nodes.lock().await;
        nodes
            .iter()
            .filter(|(_, n)| n.is_public())
            .map(|(id, n)| {
                let AgentKind::Public { url, .. } = &n.kind else { unreachable!() };
                DiscoveredAgent { agent_id: AgentId::from(id.as_str()), name: n.name.clone(), url: url.clone() }
            })
            .collect()
    }

    pub async fn add_interaction(&self, src: &AgentId, dst: &AgentId, message: &str) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        if !nodes.contains_key(dst.as_str()) {
            return Err(RegistryError::NotFound(format!("agent {dst} not registered")));
        }
        let src_node = nodes
            .get_mut(src.as_str())
            .ok_or_else(|| RegistryError::NotFound(format!("agent {src} not registered")))?;
        if !src_node.interactions.iter().any(|i| &i.dst_id == dst) {
            src_node.interactions.push(Interaction { dst_id: dst.clone(), message_excerpt: message.to_string() });
        }
        Ok(())
    }

    pub async fn delete_interaction(&self, src: &AgentId, dst: &AgentId) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        if let Some(node) = nodes.get_mut(src.as_str()) {
            if let Some(pos) = node.interactions.iter().position(|i| &i.dst_id == dst) {
                node.interactions.remove(pos);
            }
        }
        Ok(())
    }

    pub async fn interactions(&self) -> Vec<(AgentId, AgentId)> {
        let nodes = self.nodes.lock().await;
        nodes
            .iter()
            .flat_map(|(id, n)| n.interactions.iter().map(move |i| (AgentId::from(id.as_str()), i.dst_id.clone())))
            .collect()
    }

    pub async fn interactions_for(&self, id: &AgentId) -> Result<Vec<(AgentId, String)>, RegistryError> {
        let nodes = self.nodes.lock().await;
        let node = nodes.get(id.as_str()).ok_or_else(|| RegistryError::NotFound(format!("{id} not registered")))?;
        Ok(node
            .interactions
            .iter()
            .map(|i| {
                let name = nodes.get(i.dst_id.as_str()).map(|n| n.name.clone()).unwrap_or_default();
                (i.dst_id.clone(), name)
            })
            .collect())
    }

    pub async fn task_count_add(&self, agent_id: &AgentId) -> Result<(), RegistryError> {
        self.with_public_mut(agent_id, |task_count| *task_count += 1).await
    }

    pub async fn task_count_delete(&self, agent_id: &AgentId) -> Result<(), RegistryError> {
        self.with_public_mut(agent_id, |task_count| *task_count = task_count.saturating_sub(1)).await
    }

    async fn with_public_mut(&self, agent_id: &AgentId, f: impl FnOnce(&mut u32)) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        let node = nodes
            .get_mut(agent_id.as_str())
            .ok_or_else(|| RegistryError::NotFound(format!("agent {agent_id} not registered")))?;
        match &mut node.kind {
            AgentKind::Public { task_count, .. } => {
                f(task_count);
                Ok(())
            }
            AgentKind::User { .. } => Err(RegistryError::InvalidRole(format!("{agent_id} is not a public agent"))),
        }
    }

    pub async fn task_count_get(&self, agent_id: &AgentId) -> Result<u32, RegistryError> {
        let nodes = self.nodes.lock().await;
        let node = nodes
            .get(agent_id.as_str())
            .ok_or_else(|| RegistryError::NotFound(format!("agent {agent_id} not registered")))?;
        match node.kind {
            AgentKind::Public { task_count, .. } => Ok(task_count),
            AgentKind::User { .. } => Err(RegistryError::InvalidRole(format!("{agent_id} is not a public agent"))),
        }
    }

    pub async fn task_count_all(&self) -> HashMap<String, u32> {
        let nodes = self.nodes.lock().await;
        nodes
            .iter()
            .filter_map(|(id, n)| match n.kind {
                AgentKind::Public { task_count, .. } => Some((id.clone(), task_count)),
                AgentKind::User { .. } => None,
            })
            .collect()
    }

    /// Target must be a user node (Design Notes §9 open question: surface the
    /// violation rather than silently accept a public-agent target).
    fn require_user_mut<'a>(
        nodes: &'a mut HashMap<String, AgentNode>,
        user_id: &str,
    ) -> Result<&'a mut AgentNode, RegistryError> {
        let node = nodes.get_mut(user_id).ok_or_else(|| RegistryError::NotFound(format!("user {user_id} not registered")))?;
        if node.is_public() {
            return Err(RegistryError::InvalidRole(format!("{user_id} is a public agent, not a user")));
        }
        Ok(node)
    }

    pub async fn post_task_event(&self, user_id: &str, mut task: Task) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        let node = Self::require_user_mut(&mut nodes, user_id)?;
        task.created_at = now_secs();
        node.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    pub async fn post_task_status_event(&self, user_id: &str, event: TaskStatusUpdateEvent) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        let node = Self::require_user_mut(&mut nodes, user_id)?;
        let task = node
            .tasks
            .get_mut(&event.task_id)
            .ok_or_else(|| RegistryError::NotFound(format!("task {} not found for user {user_id}", event.task_id)))?;
        task.apply_status(event.state, event.message);
        Ok(())
    }

    pub async fn post_task_artifact_event(&self, user_id: &str, event: TaskArtifactUpdateEvent) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        let node = Self::require_user_mut(&mut nodes, user_id)?;
        let task = node
            .tasks
            .get_mut(&event.task_id)
            .ok_or_else(|| RegistryError::NotFound(format!("task {} not found for user {user_id}", event.task_id)))?;
        let applied = task.apply_artifact(event.artifact_id, event.name, event.parts, event.append);
        if !applied {
            return Err(RegistryError::InvalidInput("append=true against a missing artifact_id".into()));
        }
        Ok(())
    }

    pub async fn events_get_tasks(&self, user_id: &str) -> Result<HashMap<TaskId, Task>, RegistryError> {
        let nodes = self.nodes.lock().await;
        let node = nodes.get(user_id).ok_or_else(|| RegistryError::NotFound(format!("user {user_id} not registered")))?;
        Ok(node.tasks.clone())
    }

    pub async fn events_get_artifacts(&self, user_id: &str) -> Result<Vec<Artifact>, RegistryError> {
        let nodes = self.nodes.lock().await;
        let node = nodes.get(user_id).ok_or_else(|| RegistryError::NotFound(format!("user {user_id} not registered")))?;
        Ok(node.tasks.values().flat_map(|t| t.artifacts.clone()).collect())
    }

    pub async fn events_get_all_tasks(&self) -> HashMap<String, HashMap<TaskId, Task>> {
        let nodes = self.nodes.lock().await;
        nodes.iter().map(|(id, n)| (id.clone(), n.tasks.clone())).collect()
    }

    pub async fn events_get_all_artifacts(&self) -> HashMap<String, Vec<Artifact>> {
        let nodes = self.nodes.lock().await;
        nodes
            .iter()
            .map(|(id, n)| (id.clone(), n.tasks.values().flat_map(|t| t.artifacts.clone()).collect()))
            .collect()
    }

    pub async fn user_register(&self, user_id: String, user_name: String) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        if nodes.contains_key(&user_id) {
            return Err(RegistryError::AlreadyExists(format!("user {user_id} already registered")));
        }
        nodes.insert(user_id, AgentNode::new_user(user_name));
        Ok(())
    }

    pub async fn user_unregister(&self, user_id: &str) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        nodes.remove(user_id).map(|_| ()).ok_or_else(|| RegistryError::NotFound(format!("user {user_id} not registered")))
    }

    pub async fn user_unregister_all(&self) {
        let mut nodes = self.nodes.lock().await;
        nodes.retain(|_, n| n.is_public());
    }

    pub async fn user_conversation(&self, user_id: &str, context_id: &ContextId) -> Result<Vec<Message>, RegistryError> {
        let nodes = self.nodes.lock().await;
        let node = nodes.get(user_id).ok_or_else(|| RegistryError::NotFound(format!("user {user_id} not registered")))?;
        let AgentKind::User { conversations } = &node.kind else {
            return Err(RegistryError::InvalidRole(format!("{user_id} is not a user")));
        };
        Ok(conversations.get(context_id).cloned().unwrap_or_default())
    }

    pub async fn user_conversations(&self, user_id: &str) -> Result<Vec<ContextId>, RegistryError> {
        let nodes = self.nodes.lock().await;
        let node = nodes.get(user_id).ok_or_else(|| RegistryError::NotFound(format!("user {user_id} not registered")))?;
        let AgentKind::User { conversations } = &node.kind else {
            return Err(RegistryError::InvalidRole(format!("{user_id} is not a user")));
        };
        Ok(conversations.keys().cloned().collect())
    }

    /// Appends both the user and assistant turns to a user's conversation,
    /// creating it if this is its first message.
    pub async fn append_to_conversation(
        &self,
        user_id: &str,
        context_id: &ContextId,
        turns: Vec<Message>,
    ) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock().await;
        let node = nodes.get_mut(user_id).ok_or_else(|| RegistryError::NotFound(format!("user {user_id} not registered")))?;
        let AgentKind::User { conversations } = &mut node.kind else {
            return Err(RegistryError::InvalidRole(format!("{user_id} is not a user")));
        };
        conversations.entry(context_id.clone()).or_default().extend(turns);
        Ok(())
    }

    pub async fn snapshot(&self) -> HashMap<String, AgentNode> {
        self.nodes.lock().await.clone()
    }

    /// Evicts public agents whose keep-alive has lapsed. Run from a
    /// background loop woken every `keep_alive_interval`.
    pub async fn evict_expired(&self, threshold_secs: u64) -> Vec<AgentId> {
        let now = now_secs();
        let mut nodes = self.nodes.lock().await;
        let expired: Vec<String> = nodes
            .iter()
            .filter(|(_, n)| matches!(&n.kind, AgentKind::Public { last_seen, .. } if now.saturating_sub(*last_seen) > threshold_secs))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            nodes.remove(id);
        }
        expired.into_iter().map(|id| AgentId::from(id.as_str())).collect()
    }
}

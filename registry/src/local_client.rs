//! An in-process `RegistryClient`: the `/user/chat` handler's
//! peer-invocation tools talk to the graph directly instead of over HTTP,
//! since they already live in C4's own process.

use std::sync::Arc;

use agent::registry_client::{DiscoveredAgent, RegisterRequest, RegistryClient};
use agent::RuntimeError;
use async_trait::async_trait;
use protocol::{AgentId, Task, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};

use crate::graph::Graph;

pub struct LocalRegistryClient {
    graph: Arc<Graph>,
}

impl LocalRegistryClient {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }
}

fn to_runtime_error(e: crate::error::RegistryError) -> RuntimeError {
    RuntimeError::Registry(e.to_string())
}

#[async_trait]
impl RegistryClient for LocalRegistryClient {
    async fn register(&self, req: RegisterRequest) -> Result<AgentId, RuntimeError> {
        self.graph
            .register(req.name, req.url, req.category, req.expose, req.visible_to)
            .await
            .map_err(to_runtime_error)
    }

    async fn keepalive(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        self.graph.keepalive(agent_id).await.map_err(to_runtime_error)
    }

    async fn unregister(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        self.graph.unregister(agent_id).await.map_err(to_runtime_error)
    }

    async fn discover(&self, agent_id: &AgentId) -> Result<Vec<DiscoveredAgent>, RuntimeError> {
        self.graph.discover(agent_id).await.map_err(to_runtime_error)
    }

    async fn add_interaction(&self, src: &AgentId, dst: &AgentId, message: &str) -> Result<(), RuntimeError> {
        self.graph.add_interaction(src, dst, message).await.map_err(to_runtime_error)
    }

    async fn delete_interaction(&self, src: &AgentId, dst: &AgentId) -> Result<(), RuntimeError> {
        self.graph.delete_interaction(src, dst).await.map_err(to_runtime_error)
    }

    async fn task_count_add(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        self.graph.task_count_add(agent_id).await.map_err(to_runtime_error)
    }

    async fn task_count_delete(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        self.graph.task_count_delete(agent_id).await.map_err(to_runtime_error)
    }

    async fn post_task_event(&self, observer_id: &str, task: &Task) -> Result<(), RuntimeError> {
        self.graph.post_task_event(observer_id, task.clone()).await.map_err(to_runtime_error)
    }

    async fn post_task_status_event(&self, observer_id: &str, event: &TaskStatusUpdateEvent) -> Result<(), RuntimeError> {
        self.graph.post_task_status_event(observer_id, event.clone()).await.map_err(to_runtime_error)
    }

    async fn post_task_artifact_event(&self, observer_id: &str, event: &TaskArtifactUpdateEvent) -> Result<(), RuntimeError> {
        self.graph.post_task_artifact_event(observer_id, event.clone()).await.map_err(to_runtime_error)
    }
}

//! The seam a runtime and the peer-invocation tools use to talk to the
//! registry, kept as a trait so `agent` never depends on `registry` — it is
//! the registry that later depends on `agent` for its shared C5 tool
//! implementation, and a trait here is what breaks that cycle.

use async_trait::async_trait;
use protocol::{AgentId, Task, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub url: String,
    pub category: String,
    pub expose: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_to: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveredAgent {
    pub agent_id: AgentId,
    pub name: String,
    pub url: String,
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn register(&self, req: RegisterRequest) -> Result<AgentId, RuntimeError>;
    async fn keepalive(&self, agent_id: &AgentId) -> Result<(), RuntimeError>;
    async fn unregister(&self, agent_id: &AgentId) -> Result<(), RuntimeError>;
    async fn discover(&self, agent_id: &AgentId) -> Result<Vec<DiscoveredAgent>, RuntimeError>;
    async fn add_interaction(&self, src: &AgentId, dst: &AgentId, message: &str) -> Result<(), RuntimeError>;
    async fn delete_interaction(&self, src: &AgentId, dst: &AgentId) -> Result<(), RuntimeError>;
    async fn task_count_add(&self, agent_id: &AgentId) -> Result<(), RuntimeError>;
    async fn task_count_delete(&self, agent_id: &AgentId) -> Result<(), RuntimeError>;
    async fn post_task_event(&self, observer_id: &str, task: &Task) -> Result<(), RuntimeError>;
    async fn post_task_status_event(&self, observer_id: &str, event: &TaskStatusUpdateEvent) -> Result<(), RuntimeError>;
    async fn post_task_artifact_event(&self, observer_id: &str, event: &TaskArtifactUpdateEvent) -> Result<(), RuntimeError>;
}

/// Talks to the registry's REST API over HTTP, matching the wire shapes in
/// `registry`'s handlers (kept in sync by hand since this crate does not
/// depend on that one).
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    content: Option<T>,
}

impl<T> Envelope<T> {
    fn into_content(self) -> Result<T, RuntimeError> {
        if self.status == "success" {
            self.content.ok_or_else(|| RuntimeError::Registry("missing content in success response".into()))
        } else {
            Err(RuntimeError::Registry(self.message.unwrap_or_else(|| "registry error".into())))
        }
    }
}

async fn post_envelope<B: Serialize, T: for<'de> Deserialize<'de> + Default>(
    client: &reqwest::Client,
    url: String,
    body: &B,
) -> Result<T, RuntimeError> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| RuntimeError::Registry(e.to_string()))?;
    let env: Envelope<T> = resp.json().await.map_err(|e| RuntimeError::Registry(e.to_string()))?;
    env.into_content()
}

async fn post_envelope_empty<B: Serialize>(
    client: &reqwest::Client,
    url: String,
    body: &B,
) -> Result<(), RuntimeError> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| RuntimeError::Registry(e.to_string()))?;
    let env: Envelope<serde_json::Value> = resp.json().await.map_err(|e| RuntimeError::Registry(e.to_string()))?;
    if env.status == "success" {
        Ok(())
    } else {
        Err(RuntimeError::Registry(env.message.unwrap_or_else(|| "registry error".into())))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn register(&self, req: RegisterRequest) -> Result<AgentId, RuntimeError> {
        #[derive(Deserialize, Default)]
        struct Content {
            agent_id: AgentId,
        }
        let content: Content = post_envelope(&self.client, self.url("/agents/register"), &req).await?;
        Ok(content.agent_id)
    }

    async fn keepalive(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        post_envelope_empty(&self.client, self.url("/agents/keepalive"), &serde_json::json!({"agent_id": agent_id})).await
    }

    async fn unregister(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        post_envelope_empty(&self.client, self.url("/agents/unregister"), &serde_json::json!({"agent_id": agent_id})).await
    }

    async fn discover(&self, agent_id: &AgentId) -> Result<Vec<DiscoveredAgent>, RuntimeError> {
        post_envelope(&self.client, self.url("/agents/discover"), &serde_json::json!({"agent_id": agent_id})).await
    }

    async fn add_interaction(&self, src: &AgentId, dst: &AgentId, message: &str) -> Result<(), RuntimeError> {
        post_envelope_empty(
            &self.client,
            self.url("/interactions/add"),
            &serde_json::json!({"src_id": src, "dst_id": dst, "message": message}),
        )
        .await
    }

    async fn delete_interaction(&self, src: &AgentId, dst: &AgentId) -> Result<(), RuntimeError> {
        post_envelope_empty(
            &self.client,
            self.url("/interactions/delete"),
            &serde_json::json!({"src_id": src, "dst_id": dst}),
        )
        .await
    }

    async fn task_count_add(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        post_envelope_empty(&self.client, self.url("/task_count/add"), &serde_json::json!({"agent_id": agent_id})).await
    }

    async fn task_count_delete(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        post_envelope_empty(&self.client, self.url("/task_count/delete"), &serde_json::json!({"agent_id": agent_id})).await
    }

    async fn post_task_event(&self, observer_id: &str, task: &Task) -> Result<(), RuntimeError> {
        post_envelope_empty(&self.client, self.url(&format!("/events/task/{observer_id}")), task).await
    }

    async fn post_task_status_event(&self, observer_id: &str, event: &TaskStatusUpdateEvent) -> Result<(), RuntimeError> {
        post_envelope_empty(&self.client, self.url(&format!("/events/task_status/{observer_id}")), event).await
    }

    async fn post_task_artifact_event(&self, observer_id: &str, event: &TaskArtifactUpdateEvent) -> Result<(), RuntimeError> {
        post_envelope_empty(&self.client, self.url(&format!("/events/task_artifact/{observer_id}")), event).await
    }
}

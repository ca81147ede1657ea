//! The registry's axum app: one `AppState` holding the graph, file store,
//! and planner provider, and the REST handlers for every endpoint in
//! spec.md §6. Grounded on the teacher's `serve::app` (`AppState` +
//! `router(state) -> Router` + `.with_state`), restructured from one
//! WebSocket route into the registry's REST+SSE surface.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use config::AppConfig;
use protocol::{
    AgentId, AgentNode, Artifact, ContextId, Envelope, Task, TaskArtifactUpdateEvent, TaskId, TaskStatusUpdateEvent,
};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::graph::Graph;

pub struct AppState {
    pub graph: Arc<Graph>,
    pub filestore: Arc<filestore::FileStore>,
    pub provider: Arc<dyn gateway::ModelProvider>,
    pub config: AppConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/agents/register", post(agents_register))
        .route("/agents/keepalive", post(agents_keepalive))
        .route("/agents/unregister", post(agents_unregister))
        .route("/agents/discover", post(agents_discover))
        .route("/agents/all", get(agents_all))
        .route("/interactions/add", post(interactions_add))
        .route("/interactions/delete", post(interactions_delete))
        .route("/interactions", get(interactions_list))
        .route("/interactions/user/:user_id", get(interactions_for_user))
        .route("/task_count/add", post(task_count_add))
        .route("/task_count/delete", post(task_count_delete))
        .route("/task_count/:agent_id", get(task_count_get))
        .route("/task_count", get(task_count_all))
        .route("/events/task/:user_id", post(events_task))
        .route("/events/task_status/:user_id", post(events_task_status))
        .route("/events/task_artifact/:user_id", post(events_task_artifact))
        .route("/events/get/tasks/:user_id", get(events_get_tasks))
        .route("/events/get/artifacts/:user_id", get(events_get_artifacts))
        .route("/events/get/all_tasks", get(events_get_all_tasks))
        .route("/events/get/all_artifacts", get(events_get_all_artifacts))
        .route("/user/register", post(user_register))
        .route("/user/unregister", post(user_unregister))
        .route("/user/unregister_all", post(user_unregister_all))
        .route("/user/chat", post(user_chat))
        .route("/user/messages/:user_id/:conversation_id", get(user_messages))
        .route("/user/conversations/:user_id", get(user_conversations))
        .route("/graph", get(graph_snapshot))
        .with_state(state)
}

type Reply<T> = Result<Json<Envelope<T>>, RegistryError>;

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    url: String,
    category: String,
    expose: bool,
    #[serde(default)]
    visible_to: Option<Vec<String>>,
}

#[derive(Serialize)]
struct AgentIdBody {
    agent_id: AgentId,
}

async fn agents_register(State(state): State<Arc<AppState>>, Json(body): Json<RegisterBody>) -> Reply<AgentIdBody> {
    let agent_id = state.graph.register(body.name, body.url, body.category, body.expose, body.visible_to).await?;
    Ok(Json(Envelope::ok(AgentIdBody { agent_id })))
}

#[derive(Deserialize)]
struct AgentIdOnly {
    agent_id: AgentId,
}

async fn agents_keepalive(State(state): State<Arc<AppState>>, Json(body): Json<AgentIdOnly>) -> Reply<()> {
    state.graph.keepalive(&body.agent_id).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn agents_unregister(State(state): State<Arc<AppState>>, Json(body): Json<AgentIdOnly>) -> Reply<()> {
    state.graph.unregister(&body.agent_id).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn agents_discover(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AgentIdOnly>,
) -> Reply<Vec<agent::registry_client::DiscoveredAgent>> {
    let agents = state.graph.discover(&body.agent_id).await?;
    Ok(Json(Envelope::ok(agents)))
}

async fn agents_all(State(state): State<Arc<AppState>>) -> Json<Envelope<Vec<agent::registry_client::DiscoveredAgent>>> {
    Json(Envelope::ok(state.graph.get_all().await))
}

#[derive(Deserialize)]
struct InteractionBody {
    src_id: AgentId,
    dst_id: AgentId,
    #[serde(default)]
    message: String,
}

async fn interactions_add(State(state): State<Arc<AppState>>, Json(body): Json<InteractionBody>) -> Reply<()> {
    state.graph.add_interaction(&body.src_id, &body.dst_id, &body.message).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn interactions_delete(State(state): State<Arc<AppState>>, Json(body): Json<InteractionBody>) -> Reply<()> {
    state.graph.delete_interaction(&body.src_id, &body.dst_id).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn interactions_list(State(state): State<Arc<AppState>>) -> Json<Envelope<Vec<(AgentId, AgentId)>>> {
    Json(Envelope::ok(state.graph.interactions().await))
}

async fn interactions_for_user(State(state): State<Arc<AppState>>, Path(user_id): Path<String>) -> Reply<Vec<(AgentId, String)>> {
    let edges = state.graph.interactions_for(&AgentId::from(user_id.as_str())).await?;
    Ok(Json(Envelope::ok(edges)))
}

async fn task_count_add(State(state): State<Arc<AppState>>, Json(body): Json<AgentIdOnly>) -> Reply<()> {
    state.graph.task_count_add(&body.agent_id).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn task_count_delete(State(state): State<Arc<AppState>>, Json(body): Json<AgentIdOnly>) -> Reply<()> {
    state.graph.task_count_delete(&body.agent_id).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn task_count_get(State(state): State<Arc<AppState>>, Path(agent_id): Path<String>) -> Reply<u32> {
    let count = state.graph.task_count_get(&AgentId::from(agent_id.as_str())).await?;
    Ok(Json(Envelope::ok(count)))
}

async fn task_count_all(State(state): State<Arc<AppState>>) -> Json<Envelope<HashMap<String, u32>>> {
    Json(Envelope::ok(state.graph.task_count_all().await))
}

async fn events_task(State(state): State<Arc<AppState>>, Path(user_id): Path<String>, Json(task): Json<Task>) -> Reply<()> {
    state.graph.post_task_event(&user_id, task).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn events_task_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(event): Json<TaskStatusUpdateEvent>,
) -> Reply<()> {
    state.graph.post_task_status_event(&user_id, event).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn events_task_artifact(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(event): Json<TaskArtifactUpdateEvent>,
) -> Reply<()> {
    state.graph.post_task_artifact_event(&user_id, event).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn events_get_tasks(State(state): State<Arc<AppState>>, Path(user_id): Path<String>) -> Reply<HashMap<TaskId, Task>> {
    let tasks = state.graph.events_get_tasks(&user_id).await?;
    Ok(Json(Envelope::ok(tasks)))
}

async fn events_get_artifacts(State(state): State<Arc<AppState>>, Path(user_id): Path<String>) -> Reply<Vec<Artifact>> {
    let artifacts = state.graph.events_get_artifacts(&user_id).await?;
    Ok(Json(Envelope::ok(artifacts)))
}

async fn events_get_all_tasks(State(state): State<Arc<AppState>>) -> Json<Envelope<HashMap<String, HashMap<TaskId, Task>>>> {
    Json(Envelope::ok(state.graph.events_get_all_tasks().await))
}

async fn events_get_all_artifacts(State(state): State<Arc<AppState>>) -> Json<Envelope<HashMap<String, Vec<Artifact>>>> {
    Json(Envelope::ok(state.graph.events_get_all_artifacts().await))
}

#[derive(Deserialize)]
struct UserRegisterBody {
    user_id: String,
    user_name: String,
}

async fn user_register(State(state): State<Arc<AppState>>, Json(body): Json<UserRegisterBody>) -> Reply<()> {
    state.graph.user_register(body.user_id, body.user_name).await?;
    Ok(Json(Envelope::ok_empty()))
}

#[derive(Deserialize)]
struct UserIdBody {
    user_id: String,
}

async fn user_unregister(State(state): State<Arc<AppState>>, Json(body): Json<UserIdBody>) -> Reply<()> {
    state.graph.user_unregister(&body.user_id).await?;
    Ok(Json(Envelope::ok_empty()))
}

async fn user_unregister_all(State(state): State<Arc<AppState>>) -> Json<Envelope<()>> {
    state.graph.user_unregister_all().await;
    Json(Envelope::ok_empty())
}

#[derive(Deserialize)]
struct UserChatBody {
    user_id: String,
    conversation_id: ContextId,
    message: Vec<protocol::Part>,
}

async fn user_chat(State(state): State<Arc<AppState>>, Json(body): Json<UserChatBody>) -> Reply<String> {
    let prompt = state.config.system.role.clone().unwrap_or_default();
    let reply = crate::chat::user_chat(
        state.graph.clone(),
        state.filestore.clone(),
        state.provider.clone(),
        &prompt,
        &body.user_id,
        body.conversation_id,
        body.message,
    )
    .await?;
    Ok(Json(Envelope::ok(reply)))
}

async fn user_messages(
    State(state): State<Arc<AppState>>,
    Path((user_id, conversation_id)): Path<(String, String)>,
) -> Reply<Vec<protocol::Message>> {
    let messages = state.graph.user_conversation(&user_id, &ContextId::from(conversation_id.as_str())).await?;
    Ok(Json(Envelope::ok(messages)))
}

async fn user_conversations(State(state): State<Arc<AppState>>, Path(user_id): Path<String>) -> Reply<Vec<ContextId>> {
    let conversations = state.graph.user_conversations(&user_id).await?;
    Ok(Json(Envelope::ok(conversations)))
}

async fn graph_snapshot(State(state): State<Arc<AppState>>) -> Json<Envelope<HashMap<String, AgentNode>>> {
    Json(Envelope::ok(state.graph.snapshot().await))
}

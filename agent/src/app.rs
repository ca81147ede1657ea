//! Axum app for one worker: agent-card, `send_message`/`send_message_streaming`,
//! and a task lookup endpoint, grounded on the teacher's `serve/src/app.rs`
//! router/state split (swapped from a WebSocket upgrade to plain REST+SSE
//! per spec.md §6).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use protocol::{ContextId, Envelope, FabricError, Part, TaskEvent, TaskId};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::runtime::{GenericAgentRuntime, RuntimeEvent};

pub fn router(runtime: Arc<GenericAgentRuntime>) -> Router {
    Router::new()
        .route("/agent-card", get(agent_card))
        .route("/send_message", post(send_message))
        .route("/send_message_streaming", post(send_message_streaming))
        .route("/tasks/:task_id", get(get_task))
        .route("/tasks/:task_id/cancel", post(cancel_task))
        .with_state(runtime)
}

#[derive(serde::Deserialize)]
struct SendMessageRequest {
    parts: Vec<Part>,
    #[serde(default)]
    task_id: Option<TaskId>,
    #[serde(default)]
    context_id: Option<ContextId>,
}

async fn agent_card(State(runtime): State<Arc<GenericAgentRuntime>>) -> Json<protocol::AgentCard> {
    Json(runtime.card())
}

async fn get_task(State(runtime): State<Arc<GenericAgentRuntime>>, Path(task_id): Path<String>) -> impl IntoResponse {
    match runtime.get_task(&TaskId::from(task_id)).await {
        Some(task) => Json(task).into_response(),
        None => (axum::http::StatusCode::NOT_FOUND, Json(Envelope::<()>::from(FabricError::NotFound("task".into()))))
            .into_response(),
    }
}

async fn cancel_task() -> impl IntoResponse {
    (axum::http::StatusCode::NOT_IMPLEMENTED, Json(Envelope::<()>::from(FabricError::Unsupported("cancellation".into()))))
}

/// Non-streaming entry point: runs the task to completion and returns the
/// final task. Kept for non-streaming destinations (spec.md §4.5); the
/// peer-invocation tool always uses the streaming path instead.
async fn send_message(
    State(runtime): State<Arc<GenericAgentRuntime>>,
    Json(req): Json<SendMessageRequest>,
) -> impl IntoResponse {
    let (tx, mut rx) = mpsc::channel(64);
    let runtime2 = runtime.clone();
    let handle = tokio::spawn(async move { runtime2.process_message(req.parts, req.task_id, req.context_id, tx).await });

    while rx.recv().await.is_some() {}

    match handle.await {
        Ok(Ok(task_id)) => match runtime.get_task(&task_id).await {
            Some(task) => Json(task).into_response(),
            None => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(Envelope::<()>::err("task vanished"))).into_response(),
        },
        Ok(Err(e)) => (axum::http::StatusCode::from_u16(FabricError::GatewayError(String::new()).status_code()).unwrap(), Json(Envelope::<()>::err(e.to_string())))
            .into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(Envelope::<()>::err(e.to_string()))).into_response(),
    }
}

async fn send_message_streaming(
    State(runtime): State<Arc<GenericAgentRuntime>>,
    Json(req): Json<SendMessageRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let _ = runtime.process_message(req.parts, req.task_id, req.context_id, tx).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let wire: TaskEvent = match event {
            RuntimeEvent::Task(t) => TaskEvent::Task(t),
            RuntimeEvent::Status(s) => TaskEvent::Status(s),
            RuntimeEvent::Artifact(a) => TaskEvent::Artifact(a),
        };
        let data = serde_json::to_string(&wire).unwrap_or_default();
        Ok(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

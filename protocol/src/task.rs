//! Task state machine, artifacts, and the streaming update events.

use crate::ids::{ArtifactId, ContextId, TaskId};
use crate::message::Message;
use crate::part::Part;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Canceled)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: ArtifactId,
    pub name: String,
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub context_id: ContextId,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    pub created_at: u64,
}

impl Task {
    pub fn new_submitted(id: TaskId, context_id: ContextId, created_at: u64) -> Self {
        Self {
            id,
            context_id,
            state: TaskState::Submitted,
            last_message: None,
            artifacts: Vec::new(),
            created_at,
        }
    }

    /// Applies a status update, rejecting mutation once the task is terminal:
    /// terminal states accept no further mutation.
    pub fn apply_status(&mut self, state: TaskState, message: Option<Message>) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        if message.is_some() {
            self.last_message = message;
        }
    }

    /// Applies an artifact update: append parts to an existing artifact (`append=true`)
    /// or add a new artifact. Returns `false` if `append=true` targets a missing artifact_id.
    pub fn apply_artifact(&mut self, artifact_id: ArtifactId, name: String, parts: Vec<Part>, append: bool) -> bool {
        if self.state.is_terminal() {
            return true;
        }
        if append {
            if let Some(existing) = self.artifacts.iter_mut().find(|a| a.artifact_id == artifact_id) {
                existing.parts.extend(parts);
                true
            } else {
                false
            }
        } else {
            self.artifacts.push(Artifact { artifact_id, name, parts });
            true
        }
    }
}

/// Streaming task-update events: sent in order, terminated by a
/// status update carrying a terminal state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEvent {
    Task(Task),
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatusUpdateEvent {
    pub task_id: TaskId,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskArtifactUpdateEvent {
    pub task_id: TaskId,
    pub artifact_id: ArtifactId,
    pub name: String,
    pub parts: Vec<Part>,
    pub append: bool,
    #[serde(default)]
    pub last_chunk: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new_submitted(TaskId::new(), ContextId::new(), 0)
    }

    #[test]
    fn terminal_tasks_reject_further_status_updates() {
        let mut t = task();
        t.apply_status(TaskState::Completed, None);
        t.apply_status(TaskState::Failed, None);
        assert_eq!(t.state, TaskState::Completed);
    }

    #[test]
    fn append_true_requires_existing_artifact() {
        let mut t = task();
        let aid = ArtifactId::new();
        let ok = t.apply_artifact(aid.clone(), "out".into(), vec![Part::text("a")], true);
        assert!(!ok, "append against missing artifact must fail");

        t.apply_artifact(aid.clone(), "out".into(), vec![Part::text("a")], false);
        let ok2 = t.apply_artifact(aid.clone(), "out".into(), vec![Part::text("b")], true);
        assert!(ok2);
        assert_eq!(t.artifacts[0].parts.len(), 2);
    }

    #[test]
    fn append_n_times_matches_one_concatenated_update() {
        let mut incremental = task();
        let aid = ArtifactId::new();
        incremental.apply_artifact(aid.clone(), "out".into(), vec![], false);
        for chunk in ["a", "b", "c"] {
            incremental.apply_artifact(aid.clone(), "out".into(), vec![Part::text(chunk)], true);
        }

        let mut batched = task();
        let bid = ArtifactId::new();
        batched.apply_artifact(
            bid,
            "out".into(),
            vec![Part::text("a"), Part::text("b"), Part::text("c")],
            false,
        );

        let inc_text: Vec<_> = incremental.artifacts[0].parts.iter().map(|p| p.as_text().unwrap()).collect();
        let batch_text: Vec<_> = batched.artifacts[0].parts.iter().map(|p| p.as_text().unwrap()).collect();
        assert_eq!(inc_text, batch_text);
    }
}

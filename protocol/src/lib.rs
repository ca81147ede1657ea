//! Shared data model for the agent fabric: opaque ids, `Part`,
//! `Message`, `Task`/`Artifact`, the streaming task-update events, `AgentNode`/`AgentCard`,
//! and the `{status, message, content}` response envelope.
//!
//! Every other crate in the workspace (`filestore`, `gateway`, `agent`, `registry`)
//! depends on this one and never redefines these types.

pub mod agent;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod message;
pub mod part;
pub mod task;

pub use agent::{is_visible, AgentCard, AgentKind, AgentNode, Capabilities, Interaction, Skill};
pub use envelope::{Envelope, Status};
pub use error::FabricError;
pub use ids::{AgentId, ArtifactId, ContextId, FileId, MessageId, TaskId, UserId};
pub use message::{Message, Role};
pub use part::{concat_text_parts, FilePayload, Part};
pub use task::{Artifact, Task, TaskArtifactUpdateEvent, TaskEvent, TaskState, TaskStatusUpdateEvent};

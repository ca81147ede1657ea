//! C4: the single-process authority over the agent graph — registration,
//! keep-alive eviction, visibility-scoped discovery, interaction edges, task
//! counters, the task/artifact event store, user sessions, and the
//! `/user/chat` planner entry point.

pub mod app;
pub mod chat;
pub mod error;
pub mod eviction;
pub mod graph;
pub mod local_client;

pub use app::{router, AppState};
pub use error::RegistryError;
pub use graph::Graph;

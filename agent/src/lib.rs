//! The agent runtime (C3) and the peer-invocation tools (C5).
//!
//! Hosts one worker: a task state machine driven by [`runtime::GenericAgentRuntime`],
//! exposed over HTTP by [`app::router`], plus the two tools (`agent_discover`,
//! `agent_send_message`) in [`peer_tools`] that let the reasoning model
//! coordinate with peers. [`registry_client::RegistryClient`] is the seam
//! this crate uses to talk to the registry without depending on it
//! (Design Notes §9 point 2).

pub mod app;
pub mod error;
pub mod keep_alive;
pub mod peer_tools;
pub mod profile;
pub mod registry_client;
pub mod runtime;

pub use error::RuntimeError;
pub use runtime::{GenericAgentRuntime, RuntimeConfig, RuntimeEvent};

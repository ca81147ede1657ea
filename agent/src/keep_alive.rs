//! Background keep-alive loop: POSTs `keepalive(agent_id)` on an interval.
//! If the registry is unreachable the loop logs and keeps trying — the
//! registry will evict the agent from discovery, and a later successful
//! call simply resumes keep-alive without needing a fresh registration
//! (spec.md §4.3 point 2).

use std::sync::Arc;
use std::time::Duration;

use protocol::AgentId;
use tracing::{info, warn};

use crate::registry_client::RegistryClient;

pub async fn run(registry: Arc<dyn RegistryClient>, agent_id: AgentId, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match registry.keepalive(&agent_id).await {
            Ok(()) => info!(agent_id = %agent_id, "keep-alive sent"),
            Err(e) => warn!(agent_id = %agent_id, error = %e, "keep-alive failed, will retry next tick"),
        }
    }
}

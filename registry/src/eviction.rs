//! Background keep-alive eviction loop, grounded on
//! `net_simulator/nodes/system_server.py`'s `keep_alive_check` coroutine:
//! wake every `keep_alive_interval`, drop any public agent whose `last_seen`
//! has exceeded `keep_alive_threshold`.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::graph::Graph;

pub async fn run(graph: Arc<Graph>, interval: Duration, threshold: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let evicted = graph.evict_expired(threshold.as_secs()).await;
        for agent_id in evicted {
            info!(agent_id = %agent_id, "evicted agent: keep-alive lapsed");
        }
    }
}

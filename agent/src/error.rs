//! Errors surfaced by the runtime and the registry client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("registry request failed: {0}")]
    Registry(String),
    #[error("peer request failed: {0}")]
    Peer(String),
    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("file store error: {0}")]
    FileStore(#[from] filestore::FileStoreError),
    #[error("gateway error: {0}")]
    Gateway(#[from] gateway::GatewayError),
    #[error("cancellation is not supported")]
    Unsupported,
}

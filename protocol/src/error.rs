//! Error kinds shared across the fabric, surfaced either as the
//! `{status: "error", message}` envelope or, inside a runtime, as a task `failed` state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, Serialize, Deserialize)]
pub enum FabricError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("gateway error: {0}")]
    GatewayError(String),
    #[error("tool error: {0}")]
    ToolError(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl FabricError {
    /// The HTTP status code this error kind maps to at a component boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            FabricError::NotFound(_) => 404,
            FabricError::AlreadyExists(_) => 409,
            FabricError::InvalidRole(_) | FabricError::InvalidInput(_) => 400,
            FabricError::Unsupported(_) => 501,
            FabricError::GatewayError(_) | FabricError::ToolError(_) => 502,
        }
    }
}

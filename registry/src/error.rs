//! Errors surfaced by the graph and the chat handler, mapped onto the
//! `{status:"error", message}` envelope at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use protocol::{Envelope, FabricError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("gateway error: {0}")]
    Gateway(#[from] gateway::GatewayError),
}

impl RegistryError {
    fn fabric(&self) -> FabricError {
        match self {
            RegistryError::NotFound(m) => FabricError::NotFound(m.clone()),
            RegistryError::AlreadyExists(m) => FabricError::AlreadyExists(m.clone()),
            RegistryError::InvalidRole(m) => FabricError::InvalidRole(m.clone()),
            RegistryError::InvalidInput(m) => FabricError::InvalidInput(m.clone()),
            RegistryError::Gateway(e) => FabricError::GatewayError(e.to_string()),
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let fabric = self.fabric();
        let status = StatusCode::from_u16(fabric.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Envelope<()> = Envelope::err(self.to_string());
        (status, Json(body)).into_response()
    }
}

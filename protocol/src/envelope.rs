//! `{status, message?, content?}` response envelope used by every registry endpoint.

use crate::error::FabricError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(content: T) -> Self {
        Self { status: Status::Success, message: None, content: Some(content) }
    }

    pub fn ok_empty() -> Self {
        Self { status: Status::Success, message: None, content: None }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self { status: Status::Error, message: Some(error.into()), content: None }
    }
}

impl<T> From<FabricError> for Envelope<T> {
    fn from(e: FabricError) -> Self {
        Envelope::err(e.to_string())
    }
}

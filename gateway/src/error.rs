//! Gateway errors: the provider returned no choices, a tool call's arguments
//! could not be parsed, or the tool transport itself failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("provider returned no choices")]
    NoChoices,
    #[error("could not parse tool call arguments: {0}")]
    UnparsableArguments(String),
    #[error("tool transport error: {0}")]
    Transport(String),
    #[error("provider request failed: {0}")]
    Provider(String),
}

//! Turn-processing error types

use thiserror::Error;

/// Errors raised at the public entry points of the turn core
///
/// Only validation failures escape. Anything coming out of an injected
/// executor is absorbed by the handler and never shows up here.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Step at position {index} is not a mapping")]
    InvalidStep { index: usize },

    #[error("No callable tool executor available")]
    MissingExecutor,
}

/// Result alias for turn-core operations
pub type TurnResult<T> = Result<T, TurnError>;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a score update was refused. Refusals never change engine state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UpdateError {
    /// Missing or mis-typed field in the incoming message.
    #[error("invalid message: {0}")]
    Validation(String),
    /// A total or a relative magnitude that is not a usable integer.
    #[error("invalid number: {0}")]
    NumericParse(String),
    /// Relative modification whose leading character is not `+` or `-`.
    #[error("unknown operator {0:?} in relative score")]
    UnknownOperator(char),
}

impl UpdateError {
    /// Short category name used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::Validation(_) => "validation",
            UpdateError::NumericParse(_) => "numeric_parse",
            UpdateError::UnknownOperator(_) => "unknown_operator",
        }
    }
}

/// Failure to get an answer out of the authority.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Rejected(#[from] UpdateError),
    #[error("authority has stopped")]
    Stopped,
    #[error("reset is disabled on this authority")]
    ResetDisabled,
    #[error("authority unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected authority response: {0}")]
    Protocol(String),
}

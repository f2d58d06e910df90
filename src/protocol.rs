//! Authority RPC protocol.
//!
//! Endpoints and payloads exchanged between front-ends and the authority.
//! Everything travels as JSON over HTTP; records keep the public
//! `{"user", "total"}` shape.

use serde::{Deserialize, Serialize};

use crate::{error::UpdateError, record::Record};

// --- API Endpoints ---

/// Apply a `ScoreUpdate`. Body: the update; reply: [`UpdateReply`].
pub const ENDPOINT_UPDATE: &str = "/internal/update";
/// Absolute top. Body: [`TopRequest`]; reply: list of records.
pub const ENDPOINT_TOP: &str = "/internal/top";
/// Window around a rank. Body: [`RelativeTopRequest`]; reply: list of records.
pub const ENDPOINT_RELATIVE_TOP: &str = "/internal/relative_top";
/// Drop every client. `204` on success, `403` when the authority forbids it.
pub const ENDPOINT_RESET: &str = "/internal/reset";

// --- Data Transfer Objects ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopRequest {
    pub size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeTopRequest {
    pub rank: i64,
    pub scope: i64,
}

/// Outcome of an update. A refusal is a normal answer, not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateReply {
    Applied { record: Record },
    Rejected { error: UpdateError },
}

/// Error body returned by the public HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
        }
    }
}

impl From<&UpdateError> for ErrorBody {
    fn from(err: &UpdateError) -> Self {
        Self::new(err.to_string(), err.kind())
    }
}

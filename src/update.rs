//! Score reports as they arrive from clients.
//!
//! A report is a loose JSON object such as `{"user": 123, "total": 250}` or
//! `{"user": 456, "score": "+10"}`. It is parsed exactly once, at the edge,
//! into a [`ScoreUpdate`]; nothing past this module sees the raw message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::UpdateError,
    record::{ClientId, RelativeDelta, Score},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreUpdate {
    /// Replace the client's total.
    Absolute { user: ClientId, total: Score },
    /// Add to or subtract from the client's total.
    Relative { user: ClientId, delta: RelativeDelta },
}

impl ScoreUpdate {
    #[inline]
    pub fn user(&self) -> ClientId {
        match *self {
            ScoreUpdate::Absolute { user, .. } | ScoreUpdate::Relative { user, .. } => user,
        }
    }

    /// Validates a raw report. `total` wins when both `total` and `score` are present.
    pub fn from_message(message: &Value) -> Result<Self, UpdateError> {
        let fields = message
            .as_object()
            .ok_or_else(|| UpdateError::Validation("message is not a JSON object".to_owned()))?;

        let user = match fields.get("user") {
            None => return Err(UpdateError::Validation("missing `user`".to_owned())),
            Some(raw) => integer(raw)
                .ok_or_else(|| UpdateError::Validation(format!("`user` is not an integer: {raw}")))?,
        };

        if let Some(raw) = fields.get("total") {
            let total = integer(raw)
                .ok_or_else(|| UpdateError::NumericParse(format!("`total` is not an integer: {raw}")))?;
            return Ok(ScoreUpdate::Absolute { user, total });
        }

        match fields.get("score") {
            Some(Value::String(modification)) => Ok(ScoreUpdate::Relative {
                user,
                delta: modification.parse()?,
            }),
            Some(other) => Err(UpdateError::Validation(format!(
                "`score` must be a string like \"+10\", got {other}"
            ))),
            None => Err(UpdateError::Validation(
                "message carries neither `total` nor `score`".to_owned(),
            )),
        }
    }
}

/// JSON integers, or strings holding a base-10 integer. Floats, bools and null are refused.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

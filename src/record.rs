use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::UpdateError;

pub type ClientId = i64;
pub type Score = i64;

/// One reporting client and its current total. Serializes as `{"user": id, "total": score}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "user")]
    id: ClientId,
    #[serde(rename = "total")]
    score: Score,
}

impl Record {
    /// Fresh record for a first report; every client starts at zero.
    pub fn new(id: ClientId) -> Self {
        Self { id, score: 0 }
    }

    #[inline]
    pub fn id(&self) -> ClientId {
        self.id
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    pub fn set_absolute(&mut self, value: Score) {
        self.score = value;
    }

    /// Parses `<+|-><digits>` and applies it. On any failure the score is left as it was.
    pub fn apply_relative(&mut self, modification: &str) -> Result<Score, UpdateError> {
        let delta: RelativeDelta = modification.parse()?;
        self.apply_delta(delta)
    }

    pub fn apply_delta(&mut self, delta: RelativeDelta) -> Result<Score, UpdateError> {
        self.score = delta.apply_to(self.score)?;
        Ok(self.score)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

/// A parsed relative modification. `magnitude` is never negative.
///
/// On the wire it is the same `<+|-><digits>` string clients send, and
/// decoding goes through the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativeDelta {
    sign: Sign,
    magnitude: Score,
}

impl RelativeDelta {
    pub fn new(sign: Sign, magnitude: Score) -> Option<Self> {
        (magnitude >= 0).then_some(Self { sign, magnitude })
    }

    #[inline]
    pub fn sign(&self) -> Sign {
        self.sign
    }

    #[inline]
    pub fn magnitude(&self) -> Score {
        self.magnitude
    }

    /// Score after applying this delta, or an error if it leaves the `i64` range.
    pub fn apply_to(self, score: Score) -> Result<Score, UpdateError> {
        let next = match self.sign {
            Sign::Plus => score.checked_add(self.magnitude),
            Sign::Minus => score.checked_sub(self.magnitude),
        };
        next.ok_or_else(|| UpdateError::NumericParse(format!("{score} {self} overflows")))
    }
}

impl FromStr for RelativeDelta {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let sign = match chars.next() {
            None => {
                return Err(UpdateError::NumericParse(
                    "empty relative score".to_owned(),
                ))
            }
            Some('+') => Sign::Plus,
            Some('-') => Sign::Minus,
            Some(other) => return Err(UpdateError::UnknownOperator(other)),
        };
        // Only plain digits after the operator: "+-5" and "++5" are refused.
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UpdateError::NumericParse(format!(
                "{s:?} is not <+|-><digits>"
            )));
        }
        let magnitude = digits
            .parse::<Score>()
            .map_err(|_| UpdateError::NumericParse(format!("{s:?} is out of range")))?;
        Ok(Self { sign, magnitude })
    }
}

impl TryFrom<String> for RelativeDelta {
    type Error = UpdateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RelativeDelta> for String {
    fn from(delta: RelativeDelta) -> Self {
        delta.to_string()
    }
}

impl fmt::Display for RelativeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.sign {
            Sign::Plus => '+',
            Sign::Minus => '-',
        };
        write!(f, "{op}{}", self.magnitude)
    }
}

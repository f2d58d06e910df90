#![deny(clippy::uninlined_format_args)]
#![deny(clippy::to_string_in_format_args)]

//! Live leaderboard: clients report integer scores and query the ranking by
//! absolute or relative position, with tied scores sharing one position.
//!
//! One authority task owns the only [`RankingEngine`]; any number of
//! stateless HTTP front-ends forward to it.

use rustc_hash::FxHashMap;

pub type FastHashMap<K, V> = FxHashMap<K, V>;

pub mod authority;
pub mod config;
pub mod engine;
pub mod error;
pub mod frontend;
pub mod node;
pub mod order_index;
pub mod protocol;
pub mod record;
pub mod update;

pub use authority::{spawn_authority, AuthorityHandle};
pub use engine::{RankWindow, RankingEngine};
pub use error::{GatewayError, UpdateError};
pub use order_index::{Bucket, OrderIndex, Seq};
pub use record::{ClientId, Record, RelativeDelta, Score, Sign};
pub use update::ScoreUpdate;

//! The authority: the single process that holds the live leaderboard.
//!
//! [`AuthorityService`] runs in its own tokio task and drains one bounded
//! command queue, so requests are applied one at a time in the order they
//! arrive. [`AuthorityHandle`] is the cheap-to-clone sender side; the RPC
//! server in [`server`] and in-process front-ends both go through it.
//!
//! Throughput is bounded by that one task. Concurrent reads (a reader/writer
//! split) or partitioning behind a reconciling scheduler would lift the bound;
//! neither is implemented.

pub mod handle;
pub mod server;
pub mod service;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::engine::RankingEngine;

pub use handle::AuthorityHandle;
pub use service::{AuthorityCommand, AuthorityService};

/// Queue depth used when none is configured.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

/// Starts the authority task and returns a handle to it.
///
/// The task ends, yielding its engine, once every handle is dropped.
pub fn spawn_authority(
    queue_depth: usize,
    allow_reset: bool,
) -> (AuthorityHandle, JoinHandle<RankingEngine>) {
    let (command_tx, command_rx) = mpsc::channel(queue_depth.max(1));
    let service = AuthorityService::new(command_rx, allow_reset);
    let task = tokio::spawn(service.run());
    (AuthorityHandle::new(command_tx), task)
}

//! Authority actor: the only task that ever touches the leaderboard.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    engine::RankingEngine,
    error::UpdateError,
    record::Record,
    update::ScoreUpdate,
};

/// Requests sent from handles to the service. Each carries its own reply channel.
#[derive(Debug)]
pub enum AuthorityCommand {
    Update {
        update: ScoreUpdate,
        response_tx: oneshot::Sender<Result<Record, UpdateError>>,
    },
    Top {
        size: i64,
        response_tx: oneshot::Sender<Vec<Record>>,
    },
    RelativeTop {
        rank: i64,
        scope: i64,
        response_tx: oneshot::Sender<Vec<Record>>,
    },
    /// Answered with `false` when reset is disabled.
    Reset { response_tx: oneshot::Sender<bool> },
}

/// Owns the one [`RankingEngine`] and applies commands strictly in arrival order.
///
/// There is no parallelism inside the service: every mutation is atomic with
/// respect to every other mutation and every read.
pub struct AuthorityService {
    engine: RankingEngine,
    command_rx: mpsc::Receiver<AuthorityCommand>,
    allow_reset: bool,
    processed: u64,
}

impl AuthorityService {
    pub fn new(command_rx: mpsc::Receiver<AuthorityCommand>, allow_reset: bool) -> Self {
        Self::with_engine(RankingEngine::new(), command_rx, allow_reset)
    }

    pub fn with_engine(
        engine: RankingEngine,
        command_rx: mpsc::Receiver<AuthorityCommand>,
        allow_reset: bool,
    ) -> Self {
        Self {
            engine,
            command_rx,
            allow_reset,
            processed: 0,
        }
    }

    /// Runs until every handle has been dropped, then hands the engine back.
    pub async fn run(mut self) -> RankingEngine {
        info!(allow_reset = self.allow_reset, "authority ready");
        while let Some(command) = self.command_rx.recv().await {
            self.handle_command(command);
            self.processed += 1;
        }
        debug!(
            processed = self.processed,
            clients = self.engine.len(),
            "authority shutting down"
        );
        self.engine
    }

    fn handle_command(&mut self, command: AuthorityCommand) {
        // A caller that gave up waiting is not an error for the authority.
        match command {
            AuthorityCommand::Update {
                update,
                response_tx,
            } => {
                let result = self.engine.update(update);
                if let Err(err) = &result {
                    debug!(user = update.user(), error = %err, "update rejected");
                }
                let _ = response_tx.send(result);
            }
            AuthorityCommand::Top { size, response_tx } => {
                let _ = response_tx.send(self.engine.top(size));
            }
            AuthorityCommand::RelativeTop {
                rank,
                scope,
                response_tx,
            } => {
                let _ = response_tx.send(self.engine.relative_top(rank, scope));
            }
            AuthorityCommand::Reset { response_tx } => {
                if self.allow_reset {
                    info!(clients = self.engine.len(), "resetting leaderboard");
                    self.engine.reset();
                } else {
                    warn!("reset refused: disabled on this authority");
                }
                let _ = response_tx.send(self.allow_reset);
            }
        }
    }
}

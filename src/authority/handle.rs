//! Cloneable handle for talking to the authority service.

use tokio::sync::{mpsc, oneshot};

use crate::{
    authority::service::AuthorityCommand,
    error::GatewayError,
    record::Record,
    update::ScoreUpdate,
};

/// Cheap to clone; every clone feeds the same queue.
#[derive(Clone, Debug)]
pub struct AuthorityHandle {
    command_tx: mpsc::Sender<AuthorityCommand>,
}

impl AuthorityHandle {
    pub fn new(command_tx: mpsc::Sender<AuthorityCommand>) -> Self {
        Self { command_tx }
    }

    pub async fn update(&self, update: ScoreUpdate) -> Result<Record, GatewayError> {
        self.request(|response_tx| AuthorityCommand::Update {
            update,
            response_tx,
        })
        .await?
        .map_err(GatewayError::Rejected)
    }

    pub async fn top(&self, size: i64) -> Result<Vec<Record>, GatewayError> {
        self.request(|response_tx| AuthorityCommand::Top { size, response_tx })
            .await
    }

    pub async fn relative_top(&self, rank: i64, scope: i64) -> Result<Vec<Record>, GatewayError> {
        self.request(|response_tx| AuthorityCommand::RelativeTop {
            rank,
            scope,
            response_tx,
        })
        .await
    }

    pub async fn reset(&self) -> Result<(), GatewayError> {
        if self
            .request(|response_tx| AuthorityCommand::Reset { response_tx })
            .await?
        {
            Ok(())
        } else {
            Err(GatewayError::ResetDisabled)
        }
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> AuthorityCommand,
    ) -> Result<R, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(command(tx))
            .await
            .map_err(|_| GatewayError::Stopped)?;
        rx.await.map_err(|_| GatewayError::Stopped)
    }
}

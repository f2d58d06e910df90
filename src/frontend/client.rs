//! How a front-end reaches the authority.

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::{
    authority::AuthorityHandle,
    error::GatewayError,
    protocol::{
        RelativeTopRequest, TopRequest, UpdateReply, ENDPOINT_RELATIVE_TOP, ENDPOINT_RESET,
        ENDPOINT_TOP, ENDPOINT_UPDATE,
    },
    record::Record,
    update::ScoreUpdate,
};

/// The authority as seen by a front-end: in the same process, or across the network.
#[derive(Clone, Debug)]
pub enum AuthorityClient {
    Local(AuthorityHandle),
    Remote(RemoteAuthority),
}

impl AuthorityClient {
    pub async fn update(&self, update: ScoreUpdate) -> Result<Record, GatewayError> {
        match self {
            AuthorityClient::Local(handle) => handle.update(update).await,
            AuthorityClient::Remote(remote) => remote.update(update).await,
        }
    }

    pub async fn top(&self, size: i64) -> Result<Vec<Record>, GatewayError> {
        match self {
            AuthorityClient::Local(handle) => handle.top(size).await,
            AuthorityClient::Remote(remote) => remote.top(size).await,
        }
    }

    pub async fn relative_top(&self, rank: i64, scope: i64) -> Result<Vec<Record>, GatewayError> {
        match self {
            AuthorityClient::Local(handle) => handle.relative_top(rank, scope).await,
            AuthorityClient::Remote(remote) => remote.relative_top(rank, scope).await,
        }
    }

    pub async fn reset(&self) -> Result<(), GatewayError> {
        match self {
            AuthorityClient::Local(handle) => handle.reset().await,
            AuthorityClient::Remote(remote) => remote.reset().await,
        }
    }
}

impl From<AuthorityHandle> for AuthorityClient {
    fn from(handle: AuthorityHandle) -> Self {
        AuthorityClient::Local(handle)
    }
}

impl From<RemoteAuthority> for AuthorityClient {
    fn from(remote: RemoteAuthority) -> Self {
        AuthorityClient::Remote(remote)
    }
}

/// RPC client for an authority in another process.
///
/// Every call is a blocking round trip bounded by the configured timeout.
#[derive(Clone, Debug)]
pub struct RemoteAuthority {
    http_client: reqwest::Client,
    base_url: String,
}

impl RemoteAuthority {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn update(&self, update: ScoreUpdate) -> Result<Record, GatewayError> {
        match self.call(ENDPOINT_UPDATE, &update).await? {
            UpdateReply::Applied { record } => Ok(record),
            UpdateReply::Rejected { error } => Err(GatewayError::Rejected(error)),
        }
    }

    pub async fn top(&self, size: i64) -> Result<Vec<Record>, GatewayError> {
        self.call(ENDPOINT_TOP, &TopRequest { size }).await
    }

    pub async fn relative_top(&self, rank: i64, scope: i64) -> Result<Vec<Record>, GatewayError> {
        self.call(ENDPOINT_RELATIVE_TOP, &RelativeTopRequest { rank, scope })
            .await
    }

    pub async fn reset(&self) -> Result<(), GatewayError> {
        let response = self
            .http_client
            .post(self.url(ENDPOINT_RESET))
            .send()
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            StatusCode::FORBIDDEN => Err(GatewayError::ResetDisabled),
            status => Err(unexpected(ENDPOINT_RESET, status)),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn call<B, R>(&self, endpoint: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::SERVICE_UNAVAILABLE => Err(GatewayError::Stopped),
            status => Err(unexpected(endpoint, status)),
        }
    }
}

fn unexpected(endpoint: &str, status: StatusCode) -> GatewayError {
    GatewayError::Protocol(format!("{endpoint} answered {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalised() {
        let remote = RemoteAuthority::new("http://127.0.0.1:8004/", Duration::from_secs(1)).unwrap();
        assert_eq!(remote.base_url(), "http://127.0.0.1:8004");
        assert_eq!(remote.url(ENDPOINT_TOP), "http://127.0.0.1:8004/internal/top");
    }

    #[tokio::test]
    async fn unreachable_authority_is_a_transport_error() {
        let port = portpicker::pick_unused_port().expect("no free ports");
        let remote =
            RemoteAuthority::new(format!("http://127.0.0.1:{port}"), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            remote.top(3).await,
            Err(GatewayError::Transport(_))
        ));
    }
}

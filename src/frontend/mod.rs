//! Stateless front-ends.
//!
//! A front-end keeps no leaderboard state. It checks that a request is well
//! formed, forwards it to the authority and relays the answer; every query is
//! a round trip.

pub mod client;
pub mod routes;

use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

pub use client::{AuthorityClient, RemoteAuthority};
pub use routes::router;

/// Serves the public API on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    authority: AuthorityClient,
    allow_reset: bool,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(allow_reset, "front-end listening on {}", listener.local_addr()?);
    axum::serve(listener, router(authority, allow_reset))
        .with_graceful_shutdown(shutdown)
        .await
}

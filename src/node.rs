//! Process roles: wiring config into listeners, tasks and shutdown.

use anyhow::{Context, Result};
use std::future::Future;
use tokio::{net::TcpListener, sync::watch, task::JoinSet};
use tracing::info;

use crate::{
    authority::{self, spawn_authority},
    config::{AuthorityArgs, ClusterArgs, FrontendArgs},
    frontend::{self, AuthorityClient, RemoteAuthority},
};

pub async fn run_authority<F>(args: AuthorityArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding authority to {}", args.bind))?;
    let (handle, task) = spawn_authority(args.queue_depth, args.reset.allow_reset);
    authority::server::serve(listener, handle, shutdown).await?;
    let engine = task.await.context("authority task panicked")?;
    info!(clients = engine.len(), "authority stopped");
    Ok(())
}

pub async fn run_frontend<F>(args: FrontendArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let remote = RemoteAuthority::new(args.authority.clone(), args.timeout())
        .context("building authority client")?;
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding front-end to {}", args.bind))?;
    info!(authority = %remote.base_url(), "forwarding to authority");
    frontend::serve(listener, remote.into(), args.reset.allow_reset, shutdown).await?;
    Ok(())
}

/// One authority plus `args.frontends` front-ends in this process.
///
/// The authority's RPC endpoints are served too, so front-ends in other
/// processes can join; local front-ends skip the network hop.
pub async fn run_cluster<F>(args: ClusterArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let allow_reset = args.reset.allow_reset;
    let (handle, task) = spawn_authority(args.queue_depth, allow_reset);
    let (stop_tx, stop_rx) = watch::channel(false);
    let stopped = move || {
        let mut rx = stop_rx.clone();
        async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }
    };

    let mut servers = JoinSet::new();
    let authority_addr = args.authority_addr();
    let listener = TcpListener::bind(authority_addr)
        .await
        .with_context(|| format!("binding authority to {authority_addr}"))?;
    servers.spawn(authority::server::serve(listener, handle.clone(), stopped()));

    for addr in args.frontend_addrs() {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding front-end to {addr}"))?;
        let client = AuthorityClient::Local(handle.clone());
        servers.spawn(frontend::serve(listener, client, allow_reset, stopped()));
    }
    drop(handle);
    info!(
        frontends = args.frontends,
        authority = %authority_addr,
        "cluster running"
    );

    shutdown.await;
    let _ = stop_tx.send(true);
    while let Some(joined) = servers.join_next().await {
        joined.context("server task panicked")??;
    }
    let engine = task.await.context("authority task panicked")?;
    info!(clients = engine.len(), "cluster stopped");
    Ok(())
}

/// Resolves on Ctrl+C.
pub async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

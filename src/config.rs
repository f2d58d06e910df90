use clap::{ArgAction, Args, Parser, Subcommand};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use crate::authority::DEFAULT_QUEUE_DEPTH;

pub const DEFAULT_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_FRONTENDS: u16 = 4;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "SCOREBOARD_LOG", default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host the live leaderboard and answer front-end RPCs.
    Authority(AuthorityArgs),
    /// Serve the public HTTP API, forwarding every call to an authority.
    Frontend(FrontendArgs),
    /// Run one authority and several front-ends inside this process.
    Cluster(ClusterArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ResetGuard {
    /// Expose DELETE /reset. On by default only in debug builds.
    #[arg(
        long,
        env = "SCOREBOARD_ALLOW_RESET",
        default_value_t = cfg!(debug_assertions),
        action = ArgAction::Set
    )]
    pub allow_reset: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AuthorityArgs {
    /// Address for the RPC endpoints
    #[arg(long, env = "SCOREBOARD_BIND", default_value = "127.0.0.1:8004")]
    pub bind: SocketAddr,
    /// Requests that may wait for the authority before callers block
    #[arg(long, env = "SCOREBOARD_QUEUE_DEPTH", default_value_t = DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,
    #[command(flatten)]
    pub reset: ResetGuard,
}

#[derive(Args, Debug, Clone)]
pub struct FrontendArgs {
    /// Address for the public API
    #[arg(long, env = "SCOREBOARD_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,
    /// Base URL of the authority
    #[arg(long, env = "SCOREBOARD_AUTHORITY", default_value = "http://127.0.0.1:8004")]
    pub authority: String,
    /// Per-request timeout towards the authority, in milliseconds
    #[arg(long, env = "SCOREBOARD_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
    #[command(flatten)]
    pub reset: ResetGuard,
}

impl FrontendArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClusterArgs {
    #[arg(long, env = "SCOREBOARD_IP", default_value_t = DEFAULT_IP)]
    pub ip: IpAddr,
    /// Lowest front-end port; the authority sits just above the front-ends
    #[arg(long, env = "SCOREBOARD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Number of front-ends to start
    #[arg(
        long,
        env = "SCOREBOARD_FRONTENDS",
        default_value_t = DEFAULT_FRONTENDS,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub frontends: u16,
    #[arg(long, env = "SCOREBOARD_QUEUE_DEPTH", default_value_t = DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,
    #[command(flatten)]
    pub reset: ResetGuard,
}

impl ClusterArgs {
    pub fn authority_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port.saturating_add(self.frontends))
    }

    /// Front-end addresses, counting down from just below the authority.
    pub fn frontend_addrs(&self) -> Vec<SocketAddr> {
        (0..self.frontends)
            .rev()
            .map(|offset| SocketAddr::new(self.ip, self.port.saturating_add(offset)))
            .collect()
    }
}

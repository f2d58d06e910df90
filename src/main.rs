use anyhow::Result;
use clap::Parser;
use scoreboard::{
    config::{Cli, Command},
    node,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Authority(args) => node::run_authority(args, node::ctrl_c()).await,
        Command::Frontend(args) => node::run_frontend(args, node::ctrl_c()).await,
        Command::Cluster(args) => node::run_cluster(args, node::ctrl_c()).await,
    }
}

use bg_common::utils::tracing::setup_tracing;
use bg_node::{
    cli::{Cli, CliCommand},
    init::init_node,
    runner::run_node,
};
use clap::Parser;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Config tracing subscriber
    setup_tracing();

    // CLI args
    match Cli::parse().command {
        CliCommand::Run {
            listen,
            board,
            branch_budget,
        } => run_node(init_node(listen, board, branch_budget).await?).await,
    }
}

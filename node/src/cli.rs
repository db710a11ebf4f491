use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser)]
#[command()]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand)]
pub enum CliCommand {
    Run {
        /// Socket address to serve CoAP on; defaults to [::]:5683.
        #[arg(long)]
        listen: Option<SocketAddr>,
        /// Board name reported by /riot/board.
        #[arg(long)]
        board: Option<String>,
        /// Branch budget granted to each execution.
        #[arg(long)]
        branch_budget: Option<u32>,
    },
}

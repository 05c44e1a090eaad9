//! serpcluster CLI: search a query, mine keywords from the result pages and
//! cluster them.
//!
//! Runs from the command line (`run`) or as a small HTTP service (`serve`).

mod commands;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

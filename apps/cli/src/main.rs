//! Brand Guardian CLI: audit videos against brand-compliance rules.
//!
//! Runs a single audit from the terminal, serves the HTTP API, and ingests
//! regulatory documents into the rule knowledge base.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

//! Binary crate for the `meteolog` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and environment overrides
//! - Interactive configuration
//! - Wiring stdin/stdout and logging around the core loops

use clap::Parser;

mod cli;
mod console;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    logging::init(cmd.verbose);
    cmd.run().await
}

//! Newsdesk CLI: serves the article API and runs maintenance commands.
//!
//! Reads `~/.newsdesk/newsdesk.toml` (or `--config`) and talks to the
//! embedded libSQL article store.

mod commands;

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

//! BotDemo CLI: guided bot demos in the terminal.
//!
//! Lists the available bots, walks through a bot's intake questions, uploads
//! documents, and chats with the bot against a running backend.

mod commands;
mod demo;

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

//! BotDemo TUI: guided bot demos in a full-screen terminal interface.
//!
//! Shows the intake form, then the chat with documents and context panels,
//! built with `ratatui` + `crossterm`.

mod app;
mod screens;
mod widgets;

use std::sync::Arc;

use botdemo_client::HttpBackend;
use botdemo_core::DemoSession;
use botdemo_registry::BotRegistry;
use botdemo_shared::{ClientConfig, load_config};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

/// Environment variable naming a log file. Without it the TUI does not log.
const LOG_ENV: &str = "BOTDEMO_LOG";

#[derive(Parser)]
#[command(name = "botdemo-tui", version, about = "Interactive bot demo in the terminal.")]
struct Args {
    /// Bot slug (defaults to `defaults.bot` from the config).
    slug: Option<String>,

    /// Backend origin, overriding `api.base_url`.
    #[arg(long, env = "BOTDEMO_BASE_URL")]
    base_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing()?;

    let mut config = load_config()?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }
    let registry = BotRegistry::from_config(&config)?;
    let slug = args.slug.unwrap_or_else(|| config.defaults.bot.clone());
    let bot = registry.resolve(&slug)?;

    let backend = HttpBackend::new(&ClientConfig::from(&config))?;
    let session = DemoSession::new(bot, Arc::new(backend));

    let runtime = tokio::runtime::Runtime::new().wrap_err("failed to start async runtime")?;
    app::run(session, runtime.handle().clone())
}

/// Log to the file named by `BOTDEMO_LOG`, if set. Stdout belongs to the UI.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let Some(path) = std::env::var_os(LOG_ENV) else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("cannot open log file {}", path.to_string_lossy()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("botdemo=debug"));
    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

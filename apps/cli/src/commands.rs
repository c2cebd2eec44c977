//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use botdemo_registry::BotRegistry;
use botdemo_shared::{AppConfig, BotDemoConfig, IntakePhase, init_config, load_config};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;

use crate::demo::{self, DemoOptions};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// BotDemo: try a domain bot from the terminal.
#[derive(Parser)]
#[command(
    name = "botdemo",
    version,
    about = "Run guided bot demos: answer a few questions, share documents, then chat.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// List available bots.
    Bots,

    /// Show a bot's questions, document categories, and starters.
    Show {
        /// Bot slug, e.g. legal-expert.
        slug: String,
    },

    /// Run an interactive demo.
    Demo {
        /// Bot slug (defaults to `defaults.bot` from the config).
        slug: Option<String>,

        /// Backend origin, overriding `api.base_url`.
        #[arg(long, env = "BOTDEMO_BASE_URL")]
        base_url: Option<String>,

        /// Pre-answer a question as `id=value`; separate multi-select values with `;`.
        #[arg(short, long = "answer", value_name = "ID=VALUE")]
        answers: Vec<String>,

        /// Upload a document before chatting (repeatable).
        #[arg(short, long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,

        /// Skip optional questions instead of asking them.
        #[arg(long)]
        skip_optional: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "botdemo=warn",
        1 => "botdemo=info",
        2 => "botdemo=debug",
        _ => "botdemo=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Bots => cmd_bots(),
        Command::Show { slug } => cmd_show(&slug),
        Command::Demo {
            slug,
            base_url,
            answers,
            files,
            skip_optional,
        } => {
            cmd_demo(DemoArgs {
                slug,
                base_url,
                answers,
                files,
                skip_optional,
            })
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_bots() -> Result<()> {
    let config = load_config()?;
    let registry = BotRegistry::from_config(&config)?;

    for bot in registry.iter() {
        let required = bot.intake_questions.iter().filter(|q| q.required).count();
        println!(
            "  {} {:<22} {:<22} {} questions ({} required), accepts {}",
            bot.icon,
            bot.slug,
            bot.display_name(),
            bot.intake_questions.len(),
            required,
            bot.accepted_types().join(" "),
        );
    }
    Ok(())
}

fn cmd_show(slug: &str) -> Result<()> {
    let config = load_config()?;
    let registry = BotRegistry::from_config(&config)?;
    let bot = registry.resolve(slug)?;
    print_bot(&bot);
    Ok(())
}

fn print_bot(bot: &BotDemoConfig) {
    println!();
    println!("  {} {}  ({})", bot.icon, bot.display_name(), bot.slug);
    println!();
    println!("  {}", bot.welcome_message);
    println!();

    for phase in [IntakePhase::Essential, IntakePhase::Advanced] {
        let questions: Vec<_> = bot
            .intake_questions
            .iter()
            .filter(|q| q.phase == phase)
            .collect();
        if questions.is_empty() {
            continue;
        }
        match phase {
            IntakePhase::Essential => println!("  Questions:"),
            IntakePhase::Advanced => println!("  Advanced questions:"),
        }
        for q in questions {
            let marker = if q.required { "*" } else { " " };
            println!("   {marker} {:<20} {}", q.id, q.question);
            if !q.options.is_empty() {
                println!("       {}", q.options.join(" | "));
            }
        }
        println!();
    }

    if !bot.file_categories.is_empty() {
        println!("  Documents:");
        for c in &bot.file_categories {
            println!("    {:<24} {}", c.name, c.accepted_types.join(" "));
        }
        println!();
    }

    if !bot.starter_questions.is_empty() {
        println!("  Try asking:");
        for s in &bot.starter_questions {
            println!("    - {s}");
        }
        println!();
    }
}

/// Arguments of the `demo` subcommand.
pub(crate) struct DemoArgs {
    pub slug: Option<String>,
    pub base_url: Option<String>,
    pub answers: Vec<String>,
    pub files: Vec<PathBuf>,
    pub skip_optional: bool,
}

async fn cmd_demo(args: DemoArgs) -> Result<()> {
    let mut config = load_config()?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }

    let registry = BotRegistry::from_config(&config)?;
    let slug = args.slug.unwrap_or_else(|| config.defaults.bot.clone());
    let bot = registry.resolve(&slug)?;

    info!(bot = %bot.slug, base_url = %config.api.base_url, "starting demo");

    let options = DemoOptions {
        answers: demo::parse_answers(&args.answers)?,
        files: args.files,
        skip_optional: args.skip_optional,
    };
    demo::run(&config, bot, options).await
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

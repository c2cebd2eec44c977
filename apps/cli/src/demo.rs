//! Interactive terminal demo: intake questions, then a chat loop.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use botdemo_client::{HttpBackend, RawFile};
use botdemo_core::intake::validate_answer;
use botdemo_core::{DemoSession, IngestProgress};
use botdemo_shared::{
    AppConfig, BotDemoConfig, ClientConfig, DemoError, DemoStep, FileStatus, IntakeAnswer,
    IntakePhase, IntakeQuestion, QuestionKind, UploadedFile, format_bytes,
};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

/// What the `demo` subcommand was started with.
pub(crate) struct DemoOptions {
    /// Answers given with `--answer`, as raw `(id, value)` pairs.
    pub answers: Vec<(String, String)>,
    /// Documents given with `--file`.
    pub files: Vec<PathBuf>,
    pub skip_optional: bool,
}

/// Split `id=value` arguments.
pub(crate) fn parse_answers(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|arg| {
            let (id, value) = arg
                .split_once('=')
                .ok_or_else(|| eyre!("expected ID=VALUE, got '{arg}'"))?;
            Ok((id.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

enum ChatExit {
    Quit,
    Reset,
}

/// Run a demo session until the visitor quits or stdin closes.
pub(crate) async fn run(config: &AppConfig, bot: Arc<BotDemoConfig>, options: DemoOptions) -> Result<()> {
    let backend = HttpBackend::new(&ClientConfig::from(config))?;
    let session = DemoSession::new(Arc::clone(&bot), Arc::new(backend));
    let mut prompt = Prompt::new();

    println!();
    println!("  {} {}", bot.icon, bot.display_name());

    for (id, value) in &options.answers {
        let answer = match bot.question(id) {
            Some(q) => {
                let answer = answer_from_arg(q, value);
                validate_answer(q, &answer)?;
                answer
            }
            None => {
                warn!(question = %id, "answer for unknown question");
                IntakeAnswer::from(value.as_str())
            }
        };
        session.update_intake(id.clone(), answer);
    }

    if !options.files.is_empty() {
        upload(&session, &options.files).await;
    }

    loop {
        print_step(DemoStep::Intake);
        if !run_intake(&session, &mut prompt, options.skip_optional).await? {
            return Ok(());
        }
        session.start_chat()?;

        match run_chat(&session, &mut prompt).await? {
            ChatExit::Quit => return Ok(()),
            ChatExit::Reset => {
                session.reset();
                println!("  Demo reset.");
            }
        }
    }
}

fn print_step(step: DemoStep) {
    println!();
    println!(
        "  Step {} of {}: {}",
        step.number(),
        DemoStep::ALL.len(),
        step.label()
    );
    println!();
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// Ask every unanswered question. Returns `false` if stdin closed.
async fn run_intake(session: &DemoSession, prompt: &mut Prompt, skip_optional: bool) -> Result<bool> {
    let bot = Arc::clone(session.config());
    let ordered = bot
        .intake_questions
        .iter()
        .filter(|q| q.phase == IntakePhase::Essential)
        .chain(
            bot.intake_questions
                .iter()
                .filter(|q| q.phase == IntakePhase::Advanced),
        );

    for question in ordered {
        if session
            .intake_responses()
            .get(&question.id)
            .is_some_and(IntakeAnswer::is_answered)
        {
            continue;
        }
        if skip_optional && !question.required {
            continue;
        }

        print_question(question);
        loop {
            let Some(line) = prompt.ask("  > ").await? else {
                return Ok(false);
            };
            let line = line.trim();

            if line.is_empty() {
                if question.required {
                    println!("  This question is required.");
                    continue;
                }
                break;
            }

            let answer = answer_from_input(question, line);
            match validate_answer(question, &answer) {
                Ok(()) => {
                    session.update_intake(question.id.clone(), answer);
                    break;
                }
                Err(e) => println!("  {e}"),
            }
        }
    }

    Ok(true)
}

fn print_question(question: &IntakeQuestion) {
    let suffix = if question.required { " *" } else { " (optional)" };
    println!("  {}{suffix}", question.question);
    for (i, option) in question.options.iter().enumerate() {
        println!("    {}. {option}", i + 1);
    }
    match question.kind {
        QuestionKind::Multiselect => println!("    (comma-separated numbers or names)"),
        _ => {
            if let Some(hint) = &question.placeholder {
                println!("    e.g. {hint}");
            }
        }
    }
}

/// Resolve a typed option: a 1-based number or the option text itself.
fn pick_option(question: &IntakeQuestion, token: &str) -> String {
    token
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options.get(i))
        .cloned()
        .or_else(|| {
            question
                .options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(token))
                .cloned()
        })
        .unwrap_or_else(|| token.to_string())
}

fn answer_from_input(question: &IntakeQuestion, line: &str) -> IntakeAnswer {
    match question.kind {
        QuestionKind::Select => IntakeAnswer::Single(pick_option(question, line)),
        QuestionKind::Multiselect => IntakeAnswer::Multi(
            line.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| pick_option(question, t))
                .collect(),
        ),
        QuestionKind::Text | QuestionKind::Textarea => IntakeAnswer::Single(line.to_string()),
    }
}

fn answer_from_arg(question: &IntakeQuestion, value: &str) -> IntakeAnswer {
    match question.kind {
        QuestionKind::Multiselect => IntakeAnswer::Multi(
            value
                .split(';')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect(),
        ),
        _ => IntakeAnswer::Single(value.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum ChatCommand {
    Send(String),
    Upload(Vec<PathBuf>),
    Remove(usize),
    Files,
    Context,
    Starters(Option<usize>),
    Reset,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> ChatCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ChatCommand::Send(line.to_string());
    };

    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();

    match name {
        "upload" => ChatCommand::Upload(args.split_whitespace().map(PathBuf::from).collect()),
        "remove" => match args.parse() {
            Ok(n) => ChatCommand::Remove(n),
            Err(_) => ChatCommand::Unknown(line.to_string()),
        },
        "files" => ChatCommand::Files,
        "context" => ChatCommand::Context,
        "starters" => ChatCommand::Starters(args.parse().ok()),
        "reset" => ChatCommand::Reset,
        "help" => ChatCommand::Help,
        "quit" | "exit" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(line.to_string()),
    }
}

const HELP: &str = "\
  /upload <path>...   share documents with the bot
  /remove <n>         forget document n
  /files              list shared documents
  /context            show what the bot knows about you
  /starters [n]       list suggested questions, or ask number n
  /reset              start over
  /quit               leave";

async fn run_chat(session: &DemoSession, prompt: &mut Prompt) -> Result<ChatExit> {
    let bot = Arc::clone(session.config());
    print_step(DemoStep::Chat);

    if let Some(welcome) = session.messages().first() {
        println!("  {}", welcome.content);
        println!();
    }
    if bot.output_config.show_disclaimer {
        if let Some(text) = &bot.output_config.disclaimer_text {
            println!("  Note: {text}");
            println!();
        }
    }
    if !bot.starter_questions.is_empty() {
        println!("  Type /starters for suggested questions, /help for commands.");
        println!();
    }

    loop {
        let Some(line) = prompt.ask("you> ").await? else {
            return Ok(ChatExit::Quit);
        };

        match parse_command(&line) {
            ChatCommand::Send(text) if text.is_empty() => {}
            ChatCommand::Send(text) => ask(session, &text).await?,
            ChatCommand::Upload(paths) if paths.is_empty() => println!("  Usage: /upload <path>..."),
            ChatCommand::Upload(paths) => upload(session, &paths).await,
            ChatCommand::Remove(n) => {
                let files = session.files();
                match n.checked_sub(1).and_then(|i| files.get(i)) {
                    Some(file) => {
                        session.remove_file(file.id);
                        println!("  Removed {}.", file.name);
                    }
                    None => println!("  No document #{n}."),
                }
            }
            ChatCommand::Files => print_files(&session.files()),
            ChatCommand::Context => {
                let context = session.context_summary();
                if context.is_empty() {
                    println!("  The bot knows nothing about you yet.");
                } else {
                    println!("  {}:", session.context_counts());
                    for line in context.lines() {
                        println!("    {line}");
                    }
                }
            }
            ChatCommand::Starters(None) => {
                for (i, s) in bot.starter_questions.iter().enumerate() {
                    println!("  {}. {s}", i + 1);
                }
            }
            ChatCommand::Starters(Some(n)) => {
                match n.checked_sub(1).and_then(|i| bot.starter_questions.get(i)) {
                    Some(starter) => {
                        println!("you> {starter}");
                        ask(session, starter).await?;
                    }
                    None => println!("  No starter #{n}."),
                }
            }
            ChatCommand::Reset => return Ok(ChatExit::Reset),
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Quit => return Ok(ChatExit::Quit),
            ChatCommand::Unknown(cmd) => println!("  Unknown command {cmd}. Try /help."),
        }
    }
}

async fn ask(session: &DemoSession, text: &str) -> Result<()> {
    let spinner = spinner("Thinking...");
    let sent = session.send_message(text).await;
    spinner.finish_and_clear();

    match sent {
        Ok(()) => {}
        Err(DemoError::Busy) => {
            println!("  Still answering the previous question.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let Some(answer) = session.messages().pop() else {
        return Ok(());
    };
    println!();
    for line in answer.content.lines() {
        println!("bot> {line}");
    }
    if session.config().output_config.show_sources && !answer.sources.is_empty() {
        println!("  Sources:");
        for source in &answer.sources {
            match source.relevance {
                Some(r) => println!("    - {} ({r:.2})", source.title),
                None => println!("    - {}", source.title),
            }
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

async fn upload(session: &DemoSession, paths: &[PathBuf]) {
    let bot = session.config();
    let mut raw_files = Vec::with_capacity(paths.len());

    for path in paths {
        if !bot.file_categories.is_empty() && !bot.accepts(&file_name(path)) {
            println!(
                "  Skipping {}: {} accepts {}",
                path.display(),
                bot.display_name(),
                bot.accepted_types().join(" ")
            );
            continue;
        }
        match RawFile::from_path(path).await {
            Ok(raw) => raw_files.push(raw),
            Err(e) => println!("  Skipping {}: {e}", path.display()),
        }
    }
    if raw_files.is_empty() {
        return;
    }

    let progress = Arc::new(CliIngestProgress::new());
    session
        .upload_files_with(raw_files, progress.clone())
        .await;
    progress.spinner.finish_and_clear();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_files(files: &[UploadedFile]) {
    if files.is_empty() {
        println!("  No documents shared.");
        return;
    }
    for (i, f) in files.iter().enumerate() {
        println!(
            "  {}. {:<28} {:>10}  {:<16} {}",
            i + 1,
            f.name,
            format_bytes(f.size),
            f.category.as_deref().unwrap_or("-"),
            f.status.label()
        );
        if let Some(message) = &f.error_message {
            println!("     {message}");
        }
    }
}

/// Reports file pipelines on a spinner, printing a line when each settles.
struct CliIngestProgress {
    spinner: ProgressBar,
}

impl CliIngestProgress {
    fn new() -> Self {
        Self {
            spinner: spinner("Uploading..."),
        }
    }
}

impl IngestProgress for CliIngestProgress {
    fn file_changed(&self, file: &UploadedFile) {
        match file.status {
            FileStatus::Uploading | FileStatus::Processing => {
                self.spinner
                    .set_message(format!("{} {}", file.name, file.status.label()));
            }
            FileStatus::Ready => self.spinner.println(format!(
                "  ✓ {} ({}) ready",
                file.name,
                format_bytes(file.size)
            )),
            FileStatus::Error => self.spinner.println(format!(
                "  ✗ {}: {}",
                file.name,
                file.error_message.as_deref().unwrap_or("failed")
            )),
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// Line input
// ---------------------------------------------------------------------------

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `label` and read one line. `None` once stdin is closed.
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }
}

//! Composes the `additionalContext` text sent with every chat request, and
//! the short summary shown in front-end context panels.

use std::fmt;

use botdemo_shared::{BotDemoConfig, FileStatus, IntakeResponses, UploadedFile};

use crate::intake;

/// Header of the intake block.
pub const USER_CONTEXT_HEADER: &str = "USER CONTEXT:";
/// Header of the documents block.
pub const DOCUMENTS_HEADER: &str = "UPLOADED DOCUMENTS:";
/// Label for a ready file without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Render intake answers and ready documents as plain text.
///
/// Answers follow the bot's declared question order; answers to unknown
/// question ids are left out. Documents follow upload order and only
/// `ready` files are listed. With nothing to report the result is empty.
pub fn compose_context(
    config: &BotDemoConfig,
    responses: &IntakeResponses,
    files: &[UploadedFile],
) -> String {
    let answers: Vec<String> = config
        .intake_questions
        .iter()
        .filter_map(|q| {
            let answer = responses.get(&q.id)?;
            answer
                .is_answered()
                .then(|| format!("- {}: {}", q.question, answer.display()))
        })
        .collect();

    let documents: Vec<String> = ready_files(files)
        .map(|f| {
            format!(
                "- {} ({})",
                f.name,
                f.category.as_deref().unwrap_or(UNCATEGORIZED)
            )
        })
        .collect();

    let mut blocks = Vec::with_capacity(2);
    if !answers.is_empty() {
        blocks.push(format!("{USER_CONTEXT_HEADER}\n{}", answers.join("\n")));
    }
    if !documents.is_empty() {
        blocks.push(format!("{DOCUMENTS_HEADER}\n{}", documents.join("\n")));
    }
    blocks.join("\n\n")
}

fn ready_files(files: &[UploadedFile]) -> impl Iterator<Item = &UploadedFile> {
    files.iter().filter(|f| f.status == FileStatus::Ready)
}

// ---------------------------------------------------------------------------
// Panel summary
// ---------------------------------------------------------------------------

/// Counts shown in the "what the bot knows about you" panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextSummary {
    pub answers: usize,
    pub ready_files: usize,
}

impl ContextSummary {
    pub fn of(config: &BotDemoConfig, responses: &IntakeResponses, files: &[UploadedFile]) -> Self {
        Self {
            answers: intake::answered_count(&config.intake_questions, responses),
            ready_files: ready_files(files).count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.answers == 0 && self.ready_files == 0
    }
}

impl fmt::Display for ContextSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        write!(
            f,
            "{} answer{}, {} file{}",
            self.answers,
            plural(self.answers),
            self.ready_files,
            plural(self.ready_files)
        )
    }
}

//! Core domain types for bot demos: bot descriptors, intake questions,
//! uploaded documents, and chat messages.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DemoError, Result};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new time-sortable identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identifier of an uploaded file, assigned when the file is selected.
    FileId
);

uuid_id!(
    /// Identifier of a chat message.
    MessageId
);

// ---------------------------------------------------------------------------
// Demo step
// ---------------------------------------------------------------------------

/// The two phases of a guided demo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoStep {
    #[default]
    Intake,
    Chat,
}

impl DemoStep {
    /// All steps in display order.
    pub const ALL: [DemoStep; 2] = [DemoStep::Intake, DemoStep::Chat];

    /// 1-based position in the progress indicator.
    pub fn number(self) -> usize {
        match self {
            Self::Intake => 1,
            Self::Chat => 2,
        }
    }

    /// Progress indicator label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Intake => "Tell us about your needs",
            Self::Chat => "Chat with your assistant",
        }
    }
}

impl std::fmt::Display for DemoStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// Input kind of an intake question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Text,
    Textarea,
    Select,
    Multiselect,
}

impl QuestionKind {
    /// Whether answers are picked from a fixed option list.
    pub fn has_options(self) -> bool {
        matches!(self, Self::Select | Self::Multiselect)
    }
}

/// Whether a question is shown up front or behind the "advanced" toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakePhase {
    #[default]
    Essential,
    Advanced,
}

/// A single question asked before chat starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeQuestion {
    /// Stable key in the response map.
    pub id: String,
    /// Question text, also used as the label in the composed context.
    pub question: String,
    /// Input kind.
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Options for select kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Whether the question must be answered before chat can start.
    #[serde(default)]
    pub required: bool,
    /// Hint text for free-text inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub phase: IntakePhase,
}

/// An answer to one intake question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntakeAnswer {
    /// Free text or a single selected option.
    Single(String),
    /// The selected options of a multi-select.
    Multi(Vec<String>),
}

impl IntakeAnswer {
    /// A text answer counts when its trimmed value is non-empty;
    /// a multi-select counts when at least one option is selected.
    pub fn is_answered(&self) -> bool {
        match self {
            Self::Single(text) => !text.trim().is_empty(),
            Self::Multi(values) => !values.is_empty(),
        }
    }

    /// Display form used in summaries (`a, b, c` for multi-selects).
    pub fn display(&self) -> String {
        match self {
            Self::Single(text) => text.clone(),
            Self::Multi(values) => values.join(", "),
        }
    }
}

impl From<&str> for IntakeAnswer {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for IntakeAnswer {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for IntakeAnswer {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// Answers keyed by question id. Absent key means unanswered.
pub type IntakeResponses = HashMap<String, IntakeAnswer>;

// ---------------------------------------------------------------------------
// Uploaded files
// ---------------------------------------------------------------------------

/// Lifecycle state of one uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

impl FileStatus {
    /// `ready` and `error` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    /// Whether moving from `self` to `next` respects the forward-only order
    /// `uploading -> processing -> ready`, with `error` reachable from any
    /// non-terminal state.
    pub fn can_advance_to(self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (Self::Uploading, Self::Processing)
                | (Self::Processing, Self::Ready)
                | (Self::Uploading | Self::Processing, Self::Error)
        )
    }

    /// Short status text for file lists.
    pub fn label(self) -> &'static str {
        match self {
            Self::Uploading => "Uploading...",
            Self::Processing => "Processing...",
            Self::Ready => "Ready",
            Self::Error => "Error",
        }
    }
}

/// A user-supplied document and its ingestion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: FileId,
    /// Original file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type reported for the file.
    pub mime_type: String,
    /// Category id from the bot's file categories, if one matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub status: FileStatus,
    /// Why the file ended in `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedFile {
    /// Move to `next` if the transition is legal. Returns whether it applied.
    pub fn advance(&mut self, next: FileStatus) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Mark the file failed with a message, unless it is already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.advance(FileStatus::Error) {
            return false;
        }
        self.error_message = Some(message.into());
        true
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A source cited by the backend for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSource {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Relevance score in the backend's own scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// True while the assistant's answer is still pending.
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ChatSource>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>, is_streaming: bool) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming,
            sources: Vec::new(),
        }
    }

    /// A finished message from the visitor.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, false)
    }

    /// A finished message from the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, false)
    }

    /// An empty assistant message awaiting its answer.
    pub fn placeholder() -> Self {
        Self::new(Role::Assistant, String::new(), true)
    }
}

// ---------------------------------------------------------------------------
// Bot demo configuration
// ---------------------------------------------------------------------------

/// Theme colour used by front-ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    #[default]
    Blue,
    Green,
    Indigo,
    Red,
    Amber,
}

/// A group of documents a bot knows how to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Accepted file extensions including the dot (e.g. `.pdf`).
    pub accepted_types: Vec<String>,
}

impl FileCategory {
    /// Whether `file_name` has one of this category's extensions.
    pub fn accepts(&self, file_name: &str) -> bool {
        match extension_of(file_name) {
            Some(ext) => self
                .accepted_types
                .iter()
                .any(|t| t.trim_start_matches('.').eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }
}

/// Output formatting hints for front-ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub show_sources: bool,
    #[serde(default)]
    pub show_disclaimer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer_text: Option<String>,
}

/// Declarative description of one bot's demo. Read-only input to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotDemoConfig {
    /// Registry key, e.g. `legal-expert`.
    pub slug: String,
    #[serde(default)]
    pub accent_color: AccentColor,
    #[serde(default)]
    pub icon: String,
    pub system_prompt: String,
    pub welcome_message: String,
    #[serde(default)]
    pub starter_questions: Vec<String>,
    #[serde(default)]
    pub intake_questions: Vec<IntakeQuestion>,
    #[serde(default)]
    pub file_categories: Vec<FileCategory>,
    #[serde(default)]
    pub output_config: OutputConfig,
}

impl BotDemoConfig {
    /// Human-readable name derived from the slug (`legal-expert` -> `Legal Expert`).
    pub fn display_name(&self) -> String {
        self.slug
            .split('-')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&IntakeQuestion> {
        self.intake_questions.iter().find(|q| q.id == id)
    }

    /// Union of all categories' accepted extensions, first occurrence order.
    pub fn accepted_types(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for ext in self.file_categories.iter().flat_map(|c| &c.accepted_types) {
            if !out.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                out.push(ext.clone());
            }
        }
        out
    }

    /// Whether any category accepts `file_name`.
    pub fn accepts(&self, file_name: &str) -> bool {
        self.category_for(file_name).is_some()
    }

    /// First category (in declared order) that accepts `file_name`.
    pub fn category_for(&self, file_name: &str) -> Option<&FileCategory> {
        self.file_categories.iter().find(|c| c.accepts(file_name))
    }

    /// Check the descriptor is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.slug.trim().is_empty() {
            return Err(DemoError::validation("bot slug is empty"));
        }
        if self.welcome_message.trim().is_empty() {
            return Err(DemoError::validation(format!(
                "bot '{}' has an empty welcome message",
                self.slug
            )));
        }

        let mut seen: Vec<&str> = Vec::new();
        for q in &self.intake_questions {
            if seen.contains(&q.id.as_str()) {
                return Err(DemoError::validation(format!(
                    "bot '{}' declares question '{}' twice",
                    self.slug, q.id
                )));
            }
            seen.push(&q.id);

            if q.kind.has_options() && q.options.is_empty() {
                return Err(DemoError::validation(format!(
                    "question '{}' of bot '{}' is a select without options",
                    q.id, self.slug
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lowercased extension of a file name, without the dot.
fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Human-readable byte size (`0 Bytes`, `1.5 KB`, `2 MB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file(status: FileStatus) -> UploadedFile {
        UploadedFile {
            id: FileId::new(),
            name: "brief.pdf".into(),
            size: 2048,
            mime_type: "application/pdf".into(),
            category: None,
            status,
            error_message: None,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn file_id_parses_back() {
        let id = FileId::new();
        let parsed: FileId = id.to_string().parse().expect("parse FileId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn answer_counts_trimmed_text_and_non_empty_lists() {
        assert!(!IntakeAnswer::from("   ").is_answered());
        assert!(IntakeAnswer::from(" yes ").is_answered());
        assert!(!IntakeAnswer::Multi(vec![]).is_answered());
        assert!(IntakeAnswer::Multi(vec!["a".into()]).is_answered());
    }

    #[test]
    fn answer_deserializes_untagged() {
        let responses: IntakeResponses =
            serde_json::from_str(r#"{"goal": "learn", "topics": ["a", "b"]}"#).expect("parse");
        assert_eq!(responses["goal"], IntakeAnswer::from("learn"));
        assert_eq!(responses["topics"].display(), "a, b");
    }

    #[test]
    fn file_status_is_monotonic() {
        let mut file = sample_file(FileStatus::Uploading);
        assert!(!file.advance(FileStatus::Ready));
        assert!(file.advance(FileStatus::Processing));
        assert!(file.advance(FileStatus::Ready));
        assert!(!file.advance(FileStatus::Processing));
        assert!(!file.fail("late failure"));
        assert_eq!(file.status, FileStatus::Ready);
        assert!(file.error_message.is_none());
    }

    #[test]
    fn fail_records_message_from_any_non_terminal_state() {
        let mut uploading = sample_file(FileStatus::Uploading);
        assert!(uploading.fail("Upload failed"));
        assert_eq!(uploading.error_message.as_deref(), Some("Upload failed"));

        let mut processing = sample_file(FileStatus::Processing);
        assert!(processing.fail("Processing failed"));
        assert_eq!(processing.status, FileStatus::Error);
    }

    #[test]
    fn placeholder_is_empty_streaming_assistant() {
        let msg = ChatMessage::placeholder();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.is_streaming);
    }

    #[test]
    fn format_bytes_matches_ui_style() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2 MB");
    }

    fn bot() -> BotDemoConfig {
        BotDemoConfig {
            slug: "swiss-german-teacher".into(),
            accent_color: AccentColor::Red,
            icon: "🇨🇭".into(),
            system_prompt: "You are Heidi.".into(),
            welcome_message: "Grüezi!".into(),
            starter_questions: vec![],
            intake_questions: vec![IntakeQuestion {
                id: "goal".into(),
                question: "What do you want to learn?".into(),
                kind: QuestionKind::Text,
                options: vec![],
                required: true,
                placeholder: None,
                phase: IntakePhase::Essential,
            }],
            file_categories: vec![
                FileCategory {
                    id: "texts".into(),
                    name: "Texts to Translate".into(),
                    description: String::new(),
                    accepted_types: vec![".txt".into(), ".pdf".into()],
                },
                FileCategory {
                    id: "learning".into(),
                    name: "Learning Materials".into(),
                    description: String::new(),
                    accepted_types: vec![".pdf".into(), ".docx".into()],
                },
            ],
            output_config: OutputConfig::default(),
        }
    }

    #[test]
    fn display_name_title_cases_slug() {
        assert_eq!(bot().display_name(), "Swiss German Teacher");
    }

    #[test]
    fn accepted_types_are_deduplicated_in_order() {
        assert_eq!(bot().accepted_types(), vec![".txt", ".pdf", ".docx"]);
    }

    #[test]
    fn category_is_first_match_case_insensitive() {
        let bot = bot();
        assert_eq!(bot.category_for("Notes.PDF").map(|c| c.id.as_str()), Some("texts"));
        assert_eq!(bot.category_for("deck.docx").map(|c| c.id.as_str()), Some("learning"));
        assert!(!bot.accepts("photo.jpg"));
        assert!(!bot.accepts("README"));
    }

    #[test]
    fn validate_rejects_duplicate_questions_and_optionless_selects() {
        let mut dup = bot();
        dup.intake_questions.push(dup.intake_questions[0].clone());
        assert!(dup.validate().is_err());

        let mut select = bot();
        select.intake_questions[0].kind = QuestionKind::Select;
        let err = select.validate().unwrap_err();
        assert!(err.to_string().contains("without options"));

        assert!(bot().validate().is_ok());
    }
}

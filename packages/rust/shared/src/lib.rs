//! Shared types, error model, and configuration for BotDemo.
//!
//! This crate is the foundation depended on by all other BotDemo crates.
//! It provides:
//! - [`DemoError`]: the unified error type
//! - Domain types ([`BotDemoConfig`], [`IntakeQuestion`], [`UploadedFile`], [`ChatMessage`])
//! - Configuration ([`AppConfig`], [`ClientConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, ClientConfig, DefaultsConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_bearer_token,
};
pub use error::{DemoError, Result};
pub use types::{
    AccentColor, BotDemoConfig, ChatMessage, ChatSource, DemoStep, FileCategory, FileId,
    FileStatus, IntakeAnswer, IntakePhase, IntakeQuestion, IntakeResponses, MessageId,
    OutputConfig, QuestionKind, Role, UploadedFile, format_bytes,
};

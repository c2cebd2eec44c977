//! Demo session engine for BotDemo.
//!
//! This crate holds the behaviour behind a bot's guided demo:
//! - [`intake`]: the required-question gate and answer checks
//! - [`ingest`]: per-file upload and processing pipelines
//! - [`context`]: the `additionalContext` text sent with every question
//! - [`chat`]: request building and settling the pending answer
//! - [`session`]: [`DemoSession`], which ties them together

pub mod chat;
pub mod context;
pub mod ingest;
pub mod intake;
pub mod session;

pub use chat::APOLOGY;
pub use context::{ContextSummary, compose_context};
pub use ingest::{IngestProgress, SilentProgress};
pub use session::{DemoSession, SessionSnapshot};

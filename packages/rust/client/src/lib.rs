//! Backend access for bot demos.
//!
//! This crate provides:
//! - [`DemoBackend`]: the three remote operations a demo session depends on
//!   (document upload, document processing, chat)
//! - [`HttpBackend`]: the `reqwest` implementation against the site's API
//! - [`RawFile`]: a document selected by the visitor, before upload

pub mod http;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use botdemo_shared::{ChatSource, DemoError, Result};

pub use http::HttpBackend;

/// Path of the multipart upload endpoint.
pub const UPLOAD_PATH: &str = "/api/documents";
/// Path of the document processing endpoint.
pub const PROCESS_PATH: &str = "/api/documents/process";
/// Path of the demo chat endpoint.
pub const CHAT_PATH: &str = "/api/demo/chat";

// ---------------------------------------------------------------------------
// Wire-independent request/response types
// ---------------------------------------------------------------------------

/// A file chosen for upload, held in memory.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DemoError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DemoError::validation(format!("{} has no file name", path.display())))?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(name, mime_type, bytes))
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Opaque identifier the backend assigns to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId(pub String);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub system_prompt: String,
    pub additional_context: String,
}

/// A successful chat answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub sources: Vec<ChatSource>,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// The remote collaborators of a demo session.
///
/// Implementations report any non-success outcome as an `Err`; the session
/// decides how a failure is shown to the visitor.
#[async_trait]
pub trait DemoBackend: Send + Sync {
    /// Store a raw document and return the backend's identifier for it.
    async fn upload_document(&self, file: &RawFile) -> Result<DocumentId>;

    /// Parse and index a previously uploaded document.
    async fn process_document(&self, id: &DocumentId) -> Result<()>;

    /// Ask the bot a question.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;
}

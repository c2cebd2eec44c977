//! Per-file document ingestion: upload, then process.
//!
//! Every file runs its own pipeline and reports [`Transition`]s for its own
//! record. The session applies them by id, so files never wait on or
//! overwrite each other.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use botdemo_client::{DemoBackend, RawFile};
use botdemo_shared::{BotDemoConfig, FileId, FileStatus, UploadedFile};

/// A status change reported by a file pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Processing,
    Ready,
    Failed(String),
}

impl Transition {
    /// Apply to a record. Returns `false` if the record is already past it.
    pub fn apply(self, file: &mut UploadedFile) -> bool {
        match self {
            Self::Processing => file.advance(FileStatus::Processing),
            Self::Ready => file.advance(FileStatus::Ready),
            Self::Failed(message) => file.fail(message),
        }
    }
}

/// Apply `transition` to the record with `id`, if it is still listed.
pub fn apply_transition(
    files: &mut [UploadedFile],
    id: FileId,
    transition: Transition,
) -> Option<&UploadedFile> {
    let file = files.iter_mut().find(|f| f.id == id)?;
    if !transition.clone().apply(file) {
        debug!(file_id = %id, ?transition, "ignoring out-of-order transition");
    }
    Some(file)
}

/// Create the `uploading` record for a freshly selected file.
pub fn new_record(config: &BotDemoConfig, raw: &RawFile) -> UploadedFile {
    UploadedFile {
        id: FileId::new(),
        name: raw.name.clone(),
        size: raw.size(),
        mime_type: raw.mime_type.clone(),
        category: config.category_for(&raw.name).map(|c| c.id.clone()),
        status: FileStatus::Uploading,
        error_message: None,
        uploaded_at: Utc::now(),
    }
}

/// Observer for file status changes, for front-ends that print progress.
pub trait IngestProgress: Send + Sync {
    /// Called after a record changed status.
    fn file_changed(&self, file: &UploadedFile);
}

/// No-op progress reporter.
pub struct SilentProgress;

impl IngestProgress for SilentProgress {
    fn file_changed(&self, _file: &UploadedFile) {}
}

/// Drive one file through upload and processing.
///
/// Failures end the pipeline with [`Transition::Failed`]; nothing is
/// returned to the caller and nothing is retried.
#[instrument(skip_all, fields(file = %raw.name))]
pub async fn run_file(
    backend: &dyn DemoBackend,
    raw: &RawFile,
    mut report: impl FnMut(Transition) + Send,
) {
    let document_id = match backend.upload_document(raw).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "upload failed");
            report(Transition::Failed(format!("Upload failed: {e}")));
            return;
        }
    };
    report(Transition::Processing);

    match backend.process_document(&document_id).await {
        Ok(()) => {
            info!(%document_id, "document ready");
            report(Transition::Ready);
        }
        Err(e) => {
            warn!(%document_id, error = %e, "processing failed");
            report(Transition::Failed(format!("Processing failed: {e}")));
        }
    }
}

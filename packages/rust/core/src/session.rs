//! The demo session: one visitor's walk from intake to chat.
//!
//! A [`DemoSession`] is a cheap, cloneable handle. Clones share state, so a
//! front-end can hand one clone to a background task (uploads, a pending
//! chat answer) and keep reading [`DemoSession::snapshot`] from another.
//!
//! State sits behind a `std::sync::Mutex` that is never held across an
//! `.await`. Every async completion carries the generation it started in;
//! [`DemoSession::reset`] bumps the generation, so answers and file updates
//! that arrive after a reset are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{Instrument, debug, info, instrument, warn};

use botdemo_client::{ChatReply, DemoBackend, RawFile};
use botdemo_shared::{
    BotDemoConfig, ChatMessage, DemoError, DemoStep, FileId, IntakeAnswer, IntakeResponses,
    MessageId, Result, UploadedFile,
};

use crate::chat;
use crate::context::{ContextSummary, compose_context};
use crate::ingest::{self, IngestProgress, SilentProgress, Transition};
use crate::intake;

#[derive(Debug, Default)]
struct SessionState {
    step: DemoStep,
    intake_responses: IntakeResponses,
    files: Vec<UploadedFile>,
    messages: Vec<ChatMessage>,
    generation: u64,
    sending: bool,
    uploads_in_flight: usize,
}

/// A point-in-time copy of the session, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub step: DemoStep,
    pub intake_responses: IntakeResponses,
    pub files: Vec<UploadedFile>,
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    pub is_uploading: bool,
    /// The composed `additionalContext` text.
    pub context_summary: String,
    pub context_counts: ContextSummary,
    pub can_start_chat: bool,
}

/// One guided demo of one bot.
#[derive(Clone)]
pub struct DemoSession {
    config: Arc<BotDemoConfig>,
    backend: Arc<dyn DemoBackend>,
    state: Arc<Mutex<SessionState>>,
}

impl std::fmt::Debug for DemoSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoSession")
            .field("bot", &self.config.slug)
            .finish_non_exhaustive()
    }
}

impl DemoSession {
    pub fn new(config: Arc<BotDemoConfig>, backend: Arc<dyn DemoBackend>) -> Self {
        Self {
            config,
            backend,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// The bot this session demos.
    pub fn config(&self) -> &Arc<BotDemoConfig> {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn step(&self) -> DemoStep {
        self.lock().step
    }

    pub fn intake_responses(&self) -> IntakeResponses {
        self.lock().intake_responses.clone()
    }

    pub fn files(&self) -> Vec<UploadedFile> {
        self.lock().files.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    /// A chat answer is pending.
    pub fn is_loading(&self) -> bool {
        self.lock().sending
    }

    /// At least one file pipeline is running.
    pub fn is_uploading(&self) -> bool {
        self.lock().uploads_in_flight > 0
    }

    /// The `additionalContext` the next chat request would carry.
    pub fn context_summary(&self) -> String {
        let state = self.lock();
        compose_context(&self.config, &state.intake_responses, &state.files)
    }

    /// Answer and ready-file counts for context panels.
    pub fn context_counts(&self) -> ContextSummary {
        let state = self.lock();
        ContextSummary::of(&self.config, &state.intake_responses, &state.files)
    }

    /// Whether every required question is answered.
    pub fn can_start_chat(&self) -> bool {
        intake::required_answered(&self.config.intake_questions, &self.lock().intake_responses)
    }

    /// Ids of required questions still unanswered.
    pub fn missing_required(&self) -> Vec<String> {
        intake::missing_required(&self.config.intake_questions, &self.lock().intake_responses)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            step: state.step,
            intake_responses: state.intake_responses.clone(),
            files: state.files.clone(),
            messages: state.messages.clone(),
            is_loading: state.sending,
            is_uploading: state.uploads_in_flight > 0,
            context_summary: compose_context(&self.config, &state.intake_responses, &state.files),
            context_counts: ContextSummary::of(&self.config, &state.intake_responses, &state.files),
            can_start_chat: intake::required_answered(
                &self.config.intake_questions,
                &state.intake_responses,
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Intake
    // -----------------------------------------------------------------------

    /// Record an answer. Any id is accepted; unknown ids are ignored by the
    /// gate and by context composition.
    pub fn update_intake(&self, question_id: impl Into<String>, value: impl Into<IntakeAnswer>) {
        self.lock()
            .intake_responses
            .insert(question_id.into(), value.into());
    }

    /// Forget an answer entirely.
    pub fn clear_intake(&self, question_id: &str) {
        self.lock().intake_responses.remove(question_id);
    }

    /// Move from intake to chat, seeding the welcome message.
    ///
    /// Fails with [`DemoError::IntakeIncomplete`] and leaves the session
    /// untouched while a required question is unanswered. Calling it again
    /// once in chat changes nothing.
    pub fn start_chat(&self) -> Result<()> {
        let mut state = self.lock();
        if state.step == DemoStep::Chat {
            return Ok(());
        }

        let missing = intake::missing_required(&self.config.intake_questions, &state.intake_responses);
        if !missing.is_empty() {
            debug!(?missing, "chat gate closed");
            return Err(DemoError::IntakeIncomplete(missing));
        }

        state.messages = vec![ChatMessage::assistant(self.config.welcome_message.clone())];
        state.step = DemoStep::Chat;
        info!(bot = %self.config.slug, "chat started");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Upload and process files, returning once every pipeline has settled.
    ///
    /// Records are listed as `uploading` before any network call. Each file
    /// then runs concurrently and independently; a failure only marks that
    /// file's record. Pipelines are spawned tasks: dropping this future stops
    /// the waiting, not the uploads.
    pub async fn upload_files(&self, raw_files: Vec<RawFile>) -> Vec<FileId> {
        self.upload_files_with(raw_files, Arc::new(SilentProgress)).await
    }

    /// [`upload_files`](Self::upload_files) with a progress observer.
    #[instrument(skip_all, fields(bot = %self.config.slug, count = raw_files.len()))]
    pub async fn upload_files_with(
        &self,
        raw_files: Vec<RawFile>,
        progress: Arc<dyn IngestProgress>,
    ) -> Vec<FileId> {
        if raw_files.is_empty() {
            return Vec::new();
        }

        let (generation, jobs) = {
            let mut state = self.lock();
            let jobs: Vec<(FileId, RawFile)> = raw_files
                .into_iter()
                .map(|raw| {
                    let record = ingest::new_record(&self.config, &raw);
                    let id = record.id;
                    progress.file_changed(&record);
                    state.files.push(record);
                    (id, raw)
                })
                .collect();
            state.uploads_in_flight += jobs.len();
            (state.generation, jobs)
        };
        let ids: Vec<FileId> = jobs.iter().map(|(id, _)| *id).collect();

        let pipelines: Vec<_> = jobs
            .into_iter()
            .map(|(id, raw)| {
                let session = self.clone();
                let progress = Arc::clone(&progress);
                let handle = tokio::spawn(
                    async move {
                        let backend = Arc::clone(&session.backend);
                        ingest::run_file(backend.as_ref(), &raw, |transition| {
                            session.apply_file_transition(generation, id, transition, progress.as_ref());
                        })
                        .await;
                        session.finish_upload(generation);
                    }
                    .in_current_span(),
                );
                (id, handle)
            })
            .collect();

        for (id, handle) in pipelines {
            if let Err(e) = handle.await {
                warn!(file_id = %id, error = %e, "file pipeline task failed");
                self.apply_file_transition(
                    generation,
                    id,
                    Transition::Failed(format!("Upload failed: {e}")),
                    progress.as_ref(),
                );
                self.finish_upload(generation);
            }
        }

        ids
    }

    fn apply_file_transition(
        &self,
        generation: u64,
        id: FileId,
        transition: Transition,
        progress: &dyn IngestProgress,
    ) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(file_id = %id, "dropping file update from before reset");
            return;
        }
        match ingest::apply_transition(&mut state.files, id, transition) {
            Some(file) => progress.file_changed(file),
            None => debug!(file_id = %id, "file was removed; ignoring update"),
        }
    }

    fn finish_upload(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.uploads_in_flight = state.uploads_in_flight.saturating_sub(1);
        }
    }

    /// Drop a file from the list, whatever its status. Its pipeline, if
    /// still running, is not cancelled; its later updates are ignored.
    pub fn remove_file(&self, id: FileId) -> bool {
        let mut state = self.lock();
        let before = state.files.len();
        state.files.retain(|f| f.id != id);
        state.files.len() != before
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Send a visitor message and wait for the answer.
    ///
    /// Blank input is ignored. A second call while an answer is pending fails
    /// with [`DemoError::Busy`] and changes nothing. Backend failures never
    /// surface here: the pending assistant message receives an apology.
    ///
    /// The exchange runs on a spawned task, so the answer still settles the
    /// pending message if this future is dropped.
    #[instrument(skip_all, fields(bot = %self.config.slug))]
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let (generation, placeholder_id, request) = {
            let mut state = self.lock();
            if state.sending {
                return Err(DemoError::Busy);
            }

            let context = compose_context(&self.config, &state.intake_responses, &state.files);
            let request = chat::build_request(&self.config, text, context);

            let placeholder = ChatMessage::placeholder();
            let placeholder_id = placeholder.id;
            state.messages.push(ChatMessage::user(text));
            state.messages.push(placeholder);
            state.sending = true;
            (state.generation, placeholder_id, request)
        };

        debug!(context_len = request.additional_context.len(), "sending chat request");
        let session = self.clone();
        let exchange = tokio::spawn(
            async move {
                let outcome = session.backend.chat(&request).await;
                session.settle_answer(generation, placeholder_id, outcome);
            }
            .in_current_span(),
        );

        if let Err(e) = exchange.await {
            warn!(error = %e, "chat task failed");
            self.settle_answer(
                generation,
                placeholder_id,
                Err(DemoError::Network(format!("chat task failed: {e}"))),
            );
        }
        Ok(())
    }

    fn settle_answer(&self, generation: u64, placeholder_id: MessageId, outcome: Result<ChatReply>) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!("dropping chat answer from before reset");
            return;
        }
        chat::settle(&mut state.messages, placeholder_id, outcome);
        state.sending = false;
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Back to an empty intake. Work still in flight finishes in the
    /// background but cannot touch the reset session.
    pub fn reset(&self) {
        let mut state = self.lock();
        let generation = state.generation.wrapping_add(1);
        *state = SessionState {
            generation,
            ..SessionState::default()
        };
        info!(bot = %self.config.slug, generation, "session reset");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use botdemo_client::{ChatReply, ChatRequest, DocumentId};
    use botdemo_shared::{
        ChatSource, FileCategory, FileStatus, IntakePhase, IntakeQuestion, OutputConfig,
        QuestionKind, Role,
    };

    // -----------------------------------------------------------------------
    // Scripted backend
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct ScriptedBackend {
        fail_upload: HashSet<String>,
        fail_process: HashSet<String>,
        fail_chat: bool,
        reply: String,
        sources: Vec<ChatSource>,
        /// When set, uploads and chats wait for a permit before answering.
        gate: Option<Arc<Semaphore>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn answering(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                ..Self::default()
            }
        }

        fn gated(mut self, gate: &Arc<Semaphore>) -> Self {
            self.gate = Some(Arc::clone(gate));
            self
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }

        async fn wait(&self) {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
        }
    }

    #[async_trait]
    impl DemoBackend for ScriptedBackend {
        async fn upload_document(&self, file: &RawFile) -> Result<DocumentId> {
            self.wait().await;
            if self.fail_upload.contains(&file.name) {
                return Err(DemoError::http("/api/documents", 500));
            }
            Ok(DocumentId(file.name.clone()))
        }

        async fn process_document(&self, id: &DocumentId) -> Result<()> {
            if self.fail_process.contains(&id.0) {
                return Err(DemoError::http("/api/documents/process", 422));
            }
            Ok(())
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
            self.requests.lock().unwrap().push(request.clone());
            self.wait().await;
            if self.fail_chat {
                return Err(DemoError::Network("connection refused".into()));
            }
            Ok(ChatReply {
                response: self.reply.clone(),
                sources: self.sources.clone(),
            })
        }
    }

    fn question(id: &str, text: &str, kind: QuestionKind, required: bool) -> IntakeQuestion {
        IntakeQuestion {
            id: id.into(),
            question: text.into(),
            kind,
            options: match kind {
                QuestionKind::Select => vec!["Beginner (A1-A2)".into(), "Intermediate (B1-B2)".into()],
                QuestionKind::Multiselect => vec!["Lease".into(), "Employment".into()],
                _ => vec![],
            },
            required,
            placeholder: None,
            phase: IntakePhase::Essential,
        }
    }

    fn bot() -> Arc<BotDemoConfig> {
        Arc::new(BotDemoConfig {
            slug: "swiss-german-teacher".into(),
            accent_color: Default::default(),
            icon: String::new(),
            system_prompt: "You are Heidi.".into(),
            welcome_message: "Grüezi! I'm Heidi.".into(),
            starter_questions: vec![],
            intake_questions: vec![
                question("level", "What's your German level?", QuestionKind::Select, true),
                question("goal", "What is your goal?", QuestionKind::Text, true),
                question("topics", "Which topics?", QuestionKind::Multiselect, false),
            ],
            file_categories: vec![FileCategory {
                id: "contracts".into(),
                name: "Contracts".into(),
                description: String::new(),
                accepted_types: vec![".pdf".into()],
            }],
            output_config: OutputConfig::default(),
        })
    }

    fn session(backend: ScriptedBackend) -> (DemoSession, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let dyn_backend: Arc<dyn DemoBackend> = backend.clone();
        (DemoSession::new(bot(), dyn_backend), backend)
    }

    fn answer_required(session: &DemoSession) {
        session.update_intake("level", "Beginner (A1-A2)");
        session.update_intake("goal", "Order coffee in Zürich");
    }

    fn raw(name: &str) -> RawFile {
        RawFile::new(name, "application/pdf", b"%PDF".to_vec())
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached");
    }

    // -----------------------------------------------------------------------
    // Intake gate
    // -----------------------------------------------------------------------

    #[test]
    fn start_chat_blocked_while_required_unanswered() {
        let (session, _) = session(ScriptedBackend::default());
        session.update_intake("level", "Beginner (A1-A2)");
        session.update_intake("goal", "   ");

        let err = session.start_chat().unwrap_err();
        assert!(matches!(err, DemoError::IntakeIncomplete(ref ids) if ids == &["goal"]));
        assert_eq!(session.step(), DemoStep::Intake);
        assert!(session.messages().is_empty());
        assert!(!session.can_start_chat());
    }

    #[test]
    fn start_chat_seeds_exactly_the_welcome_message() {
        let (session, _) = session(ScriptedBackend::default());
        answer_required(&session);
        session.start_chat().unwrap();

        assert_eq!(session.step(), DemoStep::Chat);
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, "Grüezi! I'm Heidi.");

        // Already chatting: no second welcome.
        session.start_chat().unwrap();
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn unknown_question_ids_are_stored_but_ignored() {
        let (session, _) = session(ScriptedBackend::default());
        session.update_intake("favourite_colour", "green");
        assert!(session.intake_responses().contains_key("favourite_colour"));
        assert!(!session.can_start_chat());
        assert_eq!(session.context_summary(), "");
    }

    // -----------------------------------------------------------------------
    // Uploads
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn uploads_reach_ready_with_category() {
        let (session, _) = session(ScriptedBackend::default());
        let ids = session.upload_files(vec![raw("lease.pdf"), raw("notes.txt")]).await;

        let files = session.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files.iter().map(|f| f.id).collect::<Vec<_>>(), ids);
        assert!(files.iter().all(|f| f.status == FileStatus::Ready));
        assert_eq!(files[0].category.as_deref(), Some("contracts"));
        assert_eq!(files[1].category, None);
        assert!(!session.is_uploading());
    }

    #[tokio::test]
    async fn records_exist_before_any_network_call() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _) = session(ScriptedBackend::default().gated(&gate));

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.upload_files(vec![raw("a.pdf"), raw("b.pdf")]).await }
        });
        wait_until(|| session.files().len() == 2).await;

        assert!(session.files().iter().all(|f| f.status == FileStatus::Uploading));
        assert!(session.is_uploading());

        gate.add_permits(2);
        task.await.unwrap();
        assert!(!session.is_uploading());
    }

    #[tokio::test]
    async fn failure_is_isolated_to_its_file() {
        let (session, _) = session(ScriptedBackend {
            fail_upload: HashSet::from(["b.pdf".to_string()]),
            fail_process: HashSet::from(["c.pdf".to_string()]),
            ..ScriptedBackend::default()
        });
        session
            .upload_files(vec![raw("a.pdf"), raw("b.pdf"), raw("c.pdf"), raw("d.pdf")])
            .await;

        let files = session.files();
        let status: Vec<FileStatus> = files.iter().map(|f| f.status).collect();
        assert_eq!(
            status,
            vec![FileStatus::Ready, FileStatus::Error, FileStatus::Error, FileStatus::Ready]
        );
        assert!(files[1].error_message.as_deref().unwrap().starts_with("Upload failed"));
        assert!(files[2].error_message.as_deref().unwrap().starts_with("Processing failed"));
        assert!(files[0].error_message.is_none());
    }

    #[tokio::test]
    async fn removing_a_file_drops_it_from_context() {
        let (session, backend) = session(ScriptedBackend::answering("ok"));
        answer_required(&session);
        session.start_chat().unwrap();
        let ids = session.upload_files(vec![raw("lease.pdf")]).await;
        assert!(session.context_summary().contains("- lease.pdf (contracts)"));

        assert!(session.remove_file(ids[0]));
        assert!(!session.remove_file(ids[0]));
        session.send_message("What now?").await.unwrap();

        let sent = backend.requests();
        assert!(!sent[0].additional_context.contains("UPLOADED DOCUMENTS"));
    }

    #[tokio::test]
    async fn removed_file_ignores_late_transitions() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _) = session(ScriptedBackend::default().gated(&gate));

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.upload_files(vec![raw("a.pdf")]).await }
        });
        wait_until(|| session.files().len() == 1).await;
        let id = session.files()[0].id;
        assert!(session.remove_file(id));

        gate.add_permits(1);
        task.await.unwrap();
        assert!(session.files().is_empty());
        assert!(!session.is_uploading());
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn send_appends_two_messages_with_stable_assistant_id() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _) = session(ScriptedBackend {
            reply: "Hoi!".into(),
            sources: vec![ChatSource {
                title: "Greetings".into(),
                content: None,
                relevance: Some(1.0),
            }],
            ..ScriptedBackend::default()
        }
        .gated(&gate));
        answer_required(&session);
        session.start_chat().unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_message("  hi  ").await }
        });
        wait_until(|| session.is_loading()).await;

        let pending = session.messages();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[1].role, Role::User);
        assert_eq!(pending[1].content, "hi");
        assert!(pending[2].is_streaming);
        assert!(pending[2].content.is_empty());
        let assistant_id = pending[2].id;

        gate.add_permits(1);
        task.await.unwrap().unwrap();

        let settled = session.messages();
        assert_eq!(settled.len(), 3);
        assert_eq!(settled[2].id, assistant_id);
        assert_eq!(settled[2].content, "Hoi!");
        assert_eq!(settled[2].sources[0].title, "Greetings");
        assert!(!settled[2].is_streaming);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn blank_message_is_ignored() {
        let (session, backend) = session(ScriptedBackend::answering("unused"));
        session.send_message("   \n").await.unwrap();
        assert!(session.messages().is_empty());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn second_send_while_pending_is_busy() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, backend) = session(ScriptedBackend::answering("first").gated(&gate));
        answer_required(&session);
        session.start_chat().unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_message("one").await }
        });
        wait_until(|| session.is_loading()).await;

        let err = session.send_message("two").await.unwrap_err();
        assert!(matches!(err, DemoError::Busy));
        assert_eq!(session.messages().len(), 3);

        gate.add_permits(1);
        task.await.unwrap().unwrap();
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn request_carries_prompt_and_context() {
        let (session, backend) = session(ScriptedBackend::answering("Sure"));
        answer_required(&session);
        session.start_chat().unwrap();
        session.send_message("Help me").await.unwrap();

        let sent = backend.requests();
        assert_eq!(sent[0].message, "Help me");
        assert_eq!(sent[0].system_prompt, "You are Heidi.");
        assert_eq!(
            sent[0].additional_context,
            "USER CONTEXT:\n- What's your German level?: Beginner (A1-A2)\n- What is your goal?: Order coffee in Zürich"
        );
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn reset_restores_initial_state() {
        let (session, _) = session(ScriptedBackend::answering("ok"));
        answer_required(&session);
        session.start_chat().unwrap();
        session.upload_files(vec![raw("a.pdf")]).await;
        session.send_message("hello").await.unwrap();

        session.reset();
        let snap = session.snapshot();
        assert_eq!(snap.step, DemoStep::Intake);
        assert!(snap.intake_responses.is_empty());
        assert!(snap.files.is_empty());
        assert!(snap.messages.is_empty());
        assert!(!snap.is_loading);
        assert!(!snap.is_uploading);
        assert_eq!(snap.context_summary, "");
        assert!(snap.context_counts.is_empty());
    }

    #[tokio::test]
    async fn late_chat_answer_after_reset_is_dropped() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _) = session(ScriptedBackend::answering("too late").gated(&gate));
        answer_required(&session);
        session.start_chat().unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_message("question").await }
        });
        wait_until(|| session.is_loading()).await;

        session.reset();
        assert!(!session.is_loading());

        gate.add_permits(1);
        task.await.unwrap().unwrap();
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn late_upload_after_reset_is_dropped() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _) = session(ScriptedBackend::default().gated(&gate));

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.upload_files(vec![raw("a.pdf")]).await }
        });
        wait_until(|| session.is_uploading()).await;

        session.reset();

        gate.add_permits(1);
        task.await.unwrap();
        assert!(session.files().is_empty());
        assert!(!session.is_uploading());
    }

    // -----------------------------------------------------------------------
    // Abandoned calls
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn abandoned_send_still_settles_the_answer() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _) = session(ScriptedBackend::answering("Worth the wait").gated(&gate));
        answer_required(&session);
        session.start_chat().unwrap();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), session.send_message("hi")).await;
        assert!(abandoned.is_err());
        assert!(session.is_loading());

        gate.add_permits(1);
        wait_until(|| !session.is_loading()).await;
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "Worth the wait");
        assert!(!messages[2].is_streaming);

        gate.add_permits(1);
        session.send_message("again").await.unwrap();
        assert_eq!(session.messages().len(), 5);
    }

    #[tokio::test]
    async fn abandoned_upload_call_still_settles_files() {
        let gate = Arc::new(Semaphore::new(0));
        let (session, _) = session(ScriptedBackend::default().gated(&gate));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            session.upload_files(vec![raw("a.pdf")]),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(session.is_uploading());

        gate.add_permits(1);
        wait_until(|| !session.is_uploading()).await;
        assert_eq!(session.files()[0].status, FileStatus::Ready);
    }

    // -----------------------------------------------------------------------
    // End-to-end scenarios
    // -----------------------------------------------------------------------

    /// Intake, chat, one exchange.
    #[tokio::test]
    async fn scenario_happy_path() {
        let (session, backend) = session(ScriptedBackend::answering("Let's start with greetings."));
        assert!(!session.can_start_chat());

        answer_required(&session);
        session.update_intake("topics", vec!["Lease".to_string(), "Employment".to_string()]);
        session.start_chat().unwrap();
        session.send_message("Where do I begin?").await.unwrap();

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "Let's start with greetings.");
        assert!(backend.requests()[0]
            .additional_context
            .ends_with("- Which topics?: Lease, Employment"));
    }

    /// Documents uploaded during intake show up in the first request.
    #[tokio::test]
    async fn scenario_documents_enrich_context() {
        let (session, backend) = session(ScriptedBackend::answering("I read your lease."));
        answer_required(&session);
        session.upload_files(vec![raw("lease.pdf")]).await;
        session.start_chat().unwrap();
        session.send_message("Summarize my lease").await.unwrap();

        let context = &backend.requests()[0].additional_context;
        assert!(context.contains("\n\nUPLOADED DOCUMENTS:\n- lease.pdf (contracts)"));
        assert_eq!(session.context_counts().to_string(), "2 answers, 1 file");
    }

    /// A failing upload does not block chat or other documents.
    #[tokio::test]
    async fn scenario_upload_failure_isolated() {
        let (session, backend) = session(ScriptedBackend {
            reply: "Noted.".into(),
            fail_upload: HashSet::from(["broken.pdf".to_string()]),
            ..ScriptedBackend::default()
        });
        answer_required(&session);
        session.start_chat().unwrap();
        session.upload_files(vec![raw("good.pdf"), raw("broken.pdf")]).await;
        session.send_message("Anything?").await.unwrap();

        let context = &backend.requests()[0].additional_context;
        assert!(context.contains("good.pdf"));
        assert!(!context.contains("broken.pdf"));
    }

    /// Clearing an answer changes the next request.
    #[tokio::test]
    async fn scenario_cleared_answer_leaves_context() {
        let (session, backend) = session(ScriptedBackend::answering("ok"));
        answer_required(&session);
        session.update_intake("topics", vec!["Lease".to_string()]);
        session.start_chat().unwrap();
        session.send_message("first").await.unwrap();

        session.update_intake("topics", Vec::<String>::new());
        session.send_message("second").await.unwrap();

        let sent = backend.requests();
        assert!(sent[0].additional_context.contains("Which topics?"));
        assert!(!sent[1].additional_context.contains("Which topics?"));
    }

    /// A backend failure becomes the apology message.
    #[tokio::test]
    async fn scenario_chat_failure_apologizes() {
        let (session, _) = session(ScriptedBackend {
            fail_chat: true,
            ..ScriptedBackend::default()
        });
        answer_required(&session);
        session.start_chat().unwrap();
        session.send_message("Hello?").await.unwrap();

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, chat::APOLOGY);
        assert!(!messages[2].is_streaming);
        assert!(!session.is_loading());
    }
}

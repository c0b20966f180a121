//! The async tutoring facade a front-end talks to.
//!
//! Wraps the [`SessionController`] with the endpoint invoker, the preference
//! store and the attachment ingestor. The controller lock is only held for
//! the synchronous begin/complete steps, never across the network call: the
//! in-flight flag inside the controller is what serializes requests.

use crate::session::{SessionController, SessionState, TurnOutcome, TurnStart};
use crate::struggle::PhraseDetector;
use mathtutor_attachments::{Attachment, AttachmentIngestor, IncomingFile};
use mathtutor_config::AppConfig;
use mathtutor_core::error::{AttachmentError, Error, SessionError};
use mathtutor_core::message::Message;
use mathtutor_core::model::ModelTransport;
use mathtutor_core::store::{self, PreferenceStore, CREDENTIAL_KEY, TOPIC_STATS_KEY};
use mathtutor_core::{Grade, Mode, Result, TopicStats};
use mathtutor_providers::EndpointInvoker;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

pub struct Tutor {
    session: Mutex<SessionController>,
    credential: Mutex<Option<String>>,
    invoker: EndpointInvoker,
    store: Arc<dyn PreferenceStore>,
    ingestor: AttachmentIngestor,
}

impl Tutor {
    /// Assemble a tutor from already-built parts.
    pub fn new(
        session: SessionController,
        credential: Option<String>,
        invoker: EndpointInvoker,
        store: Arc<dyn PreferenceStore>,
        ingestor: AttachmentIngestor,
    ) -> Self {
        Self {
            session: Mutex::new(session),
            credential: Mutex::new(credential.filter(|c| !c.trim().is_empty())),
            invoker,
            store,
            ingestor,
        }
    }

    /// Load persisted state and wire everything from config.
    ///
    /// A key from config seeds the credential store only when the store has
    /// none. Unreadable topic statistics start empty.
    pub async fn open(
        config: &AppConfig,
        transport: Arc<dyn ModelTransport>,
        store: Arc<dyn PreferenceStore>,
    ) -> Result<Self> {
        let stats = match store::load::<TopicStats>(store.as_ref(), TOPIC_STATS_KEY).await {
            Ok(stats) => stats.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Could not read topic statistics, starting fresh");
                TopicStats::new()
            }
        };

        let mut credential = store::load::<String>(store.as_ref(), CREDENTIAL_KEY)
            .await?
            .filter(|c| !c.trim().is_empty());
        if credential.is_none() {
            if let Some(key) = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
                store::save(store.as_ref(), CREDENTIAL_KEY, key).await?;
                info!("Seeded API key from configuration");
                credential = Some(key.to_string());
            }
        }

        let mut session = SessionController::new(stats);
        if let Some(instruction) = &config.tutor.system_instruction {
            session = session.with_base_instruction(instruction.clone());
        }
        if let Some(phrases) = &config.tutor.struggle_phrases {
            session = session.with_struggle_signal(Arc::new(PhraseDetector::new(phrases)));
        }

        let invoker = EndpointInvoker::from_config(config, transport, store.clone());
        info!(
            store = store.name(),
            endpoints = invoker.endpoints().len(),
            has_credential = credential.is_some(),
            "Tutor ready"
        );

        Ok(Self::new(
            session,
            credential,
            invoker,
            store,
            AttachmentIngestor::with_defaults(),
        ))
    }

    /// Replace the attachment ingestor.
    pub fn with_ingestor(mut self, ingestor: AttachmentIngestor) -> Self {
        self.ingestor = ingestor;
        self
    }

    fn session(&self) -> MutexGuard<'_, SessionController> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_credential(&self) -> Option<String> {
        self.credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Read-side snapshots ───────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.session().state()
    }

    pub fn grade(&self) -> Option<Grade> {
        self.session().grade()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.session().mode()
    }

    pub fn active_topic(&self) -> Option<String> {
        self.session().active_topic().map(str::to_string)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.session().messages().to_vec()
    }

    pub fn stats(&self) -> TopicStats {
        self.session().stats().clone()
    }

    pub fn suggested_topics(&self) -> Vec<&'static str> {
        self.session().suggested_topics()
    }

    pub fn in_flight(&self) -> bool {
        self.session().in_flight()
    }

    pub fn last_error(&self) -> Option<String> {
        self.session().last_error().map(str::to_string)
    }

    pub fn has_credential(&self) -> bool {
        self.current_credential().is_some()
    }

    // ── Navigation ────────────────────────────────────────────────────────

    pub fn choose_grade(&self, grade: Grade) {
        self.session().choose_grade(grade);
    }

    pub fn choose_mode(&self, mode: Mode) -> Result<()> {
        Ok(self.session().choose_mode(mode)?)
    }

    pub fn switch_mode(&self) -> Result<()> {
        Ok(self.session().switch_mode()?)
    }

    pub fn back(&self) -> Result<()> {
        Ok(self.session().back()?)
    }

    pub fn reset(&self) {
        self.session().reset();
    }

    // ── Credential ────────────────────────────────────────────────────────

    /// Trim and persist an API key.
    pub async fn save_credential(&self, input: &str) -> Result<()> {
        let key = input.trim();
        if key.is_empty() {
            return Err(Error::Session(SessionError::InvalidCredential));
        }
        store::save(self.store.as_ref(), CREDENTIAL_KEY, key).await?;
        *self.credential.lock().unwrap_or_else(PoisonError::into_inner) = Some(key.to_string());
        info!("API key saved");
        Ok(())
    }

    // ── Attachments ───────────────────────────────────────────────────────

    /// Read and ingest a file from disk.
    ///
    /// A rejected file is kept as the session's last error; the conversation
    /// is untouched.
    pub async fn attach_file(&self, path: &Path) -> Result<Attachment> {
        let file = match IncomingFile::from_path(path).await {
            Ok(file) => file,
            Err(e) => return Err(self.attachment_failed(e)),
        };
        self.attach(file).await
    }

    /// Ingest an in-memory file.
    pub async fn attach(&self, file: IncomingFile) -> Result<Attachment> {
        self.ingestor
            .ingest(file)
            .await
            .map_err(|e| self.attachment_failed(e))
    }

    fn attachment_failed(&self, err: AttachmentError) -> Error {
        let err = Error::from(err);
        warn!(error = %err, "Attachment rejected");
        self.session().record_error(err.to_string());
        err
    }

    // ── Turns ─────────────────────────────────────────────────────────────

    /// Send a student turn.
    ///
    /// Returns `Skipped` for empty input, a request already in flight or a
    /// missing key. Model failures are returned as `Err` and also kept as the
    /// session's last error.
    pub async fn send_user_turn(&self, text: &str, attachment: Option<Attachment>) -> Result<TurnOutcome> {
        let credential = self.current_credential();
        let start = self
            .session()
            .begin_user_turn(text, attachment, credential.as_deref())?;
        self.run(start).await
    }

    /// Start guided practice on `topic` and fetch the opening problem.
    pub async fn start_guided_topic(&self, topic: &str) -> Result<TurnOutcome> {
        let credential = self.current_credential();
        let (stats, start) = {
            let mut session = self.session();
            session.start_topic(topic)?;
            let start = session.begin_opening_turn(credential.as_deref())?;
            (session.stats().clone(), start)
        };
        self.persist_stats(&stats).await;
        self.run(start).await
    }

    async fn run(&self, start: TurnStart) -> Result<TurnOutcome> {
        let pending = match start {
            TurnStart::Ready(pending) => pending,
            TurnStart::Skipped { reason, attachment } => {
                return Ok(TurnOutcome::Skipped { reason, attachment });
            }
        };

        let result = self
            .invoker
            .invoke(pending.contents.clone(), &pending.system_instruction, &pending.credential)
            .await;

        let (outcome, stats) = {
            let mut session = self.session();
            let outcome = session.complete_turn(&pending, result)?;
            (outcome, session.stats().clone())
        };

        if let TurnOutcome::Replied { struggle_recorded: true, .. } = outcome {
            self.persist_stats(&stats).await;
        }
        Ok(outcome)
    }

    async fn persist_stats(&self, stats: &TopicStats) {
        if let Err(e) = store::save(self.store.as_ref(), TOPIC_STATS_KEY, stats).await {
            warn!(error = %e, "Failed to persist topic statistics");
        }
    }
}

//! The tutoring session state machine.
//!
//! ```text
//! NoGrade ──grade──▶ GradeChosen ──mode=chat──▶ ActiveChat
//!                         │
//!                         └──mode=practice──▶ ActiveSelectingTopic ──topic──▶ ActivePractice
//!
//! ActiveChat ⇄ switch ⇄ ActiveSelectingTopic   (message log cleared)
//! ActivePractice ──switch──▶ ActiveChat
//! any ──reset──▶ NoGrade                        (topic stats kept)
//! ```
//!
//! The controller does no I/O. A request is split in two: `begin_*` appends
//! the user turn, marks the session busy and returns a [`PendingTurn`];
//! `complete_turn` applies the model result. Every transition that abandons
//! the conversation bumps an epoch, so a result that arrives after a reset or
//! mode switch is recognized as stale and dropped.

use crate::personalization::build_instruction;
use crate::prompts;
use crate::struggle::{PhraseDetector, StruggleSignal};
use chrono::Utc;
use mathtutor_attachments::{Attachment, AttachmentPayload};
use mathtutor_core::error::{InvokeError, SessionError};
use mathtutor_core::message::{Conversation, Message};
use mathtutor_core::model::{Content, GenerateContentResponse, Part};
use mathtutor_core::{Grade, Mode, TopicStats};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the session is in the selection flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoGrade,
    GradeChosen,
    ActiveChat,
    ActiveSelectingTopic,
    ActivePractice,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::ActiveChat | SessionState::ActiveSelectingTopic | SessionState::ActivePractice
        )
    }

    fn accepts_messages(self) -> bool {
        matches!(self, SessionState::ActiveChat | SessionState::ActivePractice)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SessionState::NoGrade => "no grade is selected",
            SessionState::GradeChosen => "no mode is selected",
            SessionState::ActiveChat => "in open chat",
            SessionState::ActiveSelectingTopic => "selecting a practice topic",
            SessionState::ActivePractice => "practicing a topic",
        };
        f.write_str(text)
    }
}

/// Who authored the request text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// Typed by the student; replies are scanned for struggle signals.
    Student,
    /// The automatic request for an opening practice problem.
    Opening,
}

/// Why a send did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyInput,
    InFlight,
    NoCredential,
}

/// A request ready to be sent to the model.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub epoch: u64,
    pub kind: TurnKind,
    pub contents: Vec<Content>,
    pub system_instruction: String,
    pub credential: String,
}

/// Result of trying to start a turn.
#[derive(Debug)]
pub enum TurnStart {
    Ready(PendingTurn),
    /// Nothing was appended or sent. An unsent attachment is handed back.
    Skipped {
        reason: SkipReason,
        attachment: Option<Attachment>,
    },
}

/// Result of a turn, as seen by the front-end.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant reply was appended to the log.
    Replied {
        text: String,
        struggle_recorded: bool,
    },
    /// The session moved on while the request was in flight; the reply was dropped.
    Stale,
    Skipped {
        reason: SkipReason,
        attachment: Option<Attachment>,
    },
}

/// Owns one tutoring session plus the cross-session topic statistics.
pub struct SessionController {
    grade: Option<Grade>,
    mode: Option<Mode>,
    conversation: Conversation,
    active_topic: Option<String>,
    stats: TopicStats,
    in_flight: bool,
    epoch: u64,
    last_error: Option<String>,
    base_instruction: String,
    struggle_signal: Arc<dyn StruggleSignal>,
}

impl SessionController {
    /// Create a controller over previously persisted topic statistics.
    pub fn new(stats: TopicStats) -> Self {
        Self {
            grade: None,
            mode: None,
            conversation: Conversation::new(),
            active_topic: None,
            stats,
            in_flight: false,
            epoch: 0,
            last_error: None,
            base_instruction: prompts::BASE_INSTRUCTION.to_string(),
            struggle_signal: Arc::new(PhraseDetector::default()),
        }
    }

    /// Replace the built-in base system instruction.
    pub fn with_base_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.base_instruction = instruction.into();
        self
    }

    /// Replace the struggle predicate.
    pub fn with_struggle_signal(mut self, signal: Arc<dyn StruggleSignal>) -> Self {
        self.struggle_signal = signal;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        match (self.grade, self.mode, &self.active_topic) {
            (None, _, _) => SessionState::NoGrade,
            (Some(_), None, _) => SessionState::GradeChosen,
            (Some(_), Some(Mode::Chat), _) => SessionState::ActiveChat,
            (Some(_), Some(Mode::GuidedPractice), None) => SessionState::ActiveSelectingTopic,
            (Some(_), Some(Mode::GuidedPractice), Some(_)) => SessionState::ActivePractice,
        }
    }

    pub fn grade(&self) -> Option<Grade> {
        self.grade
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn active_topic(&self) -> Option<&str> {
        self.active_topic.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn stats(&self) -> &TopicStats {
        &self.stats
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Keep a failure surfaced outside a model turn, such as a rejected attachment.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Suggested practice topics for the chosen grade.
    pub fn suggested_topics(&self) -> Vec<&'static str> {
        self.grade
            .map(|g| g.suggested_topics(&self.stats))
            .unwrap_or_default()
    }

    /// The instruction that would accompany a request right now.
    pub fn system_instruction(&self) -> Option<String> {
        let (grade, mode) = (self.grade?, self.mode?);
        Some(build_instruction(&self.base_instruction, grade, mode, &self.stats))
    }

    // ── Transitions ───────────────────────────────────────────────────────

    fn invalid(&self, action: &str) -> SessionError {
        SessionError::InvalidTransition {
            state: self.state().to_string(),
            action: action.to_string(),
        }
    }

    /// Drop the current conversation. Outstanding requests become stale.
    fn abandon_conversation(&mut self) {
        self.conversation = Conversation::new();
        self.active_topic = None;
        self.in_flight = false;
        self.epoch += 1;
    }

    fn seed_chat_greeting(&mut self) {
        if let Some(grade) = self.grade {
            self.conversation
                .push(Message::assistant(prompts::chat_greeting(grade)));
        }
    }

    /// Select (or change) the grade. Any active conversation is dropped.
    pub fn choose_grade(&mut self, grade: Grade) {
        if self.state().is_active() {
            self.abandon_conversation();
        }
        self.grade = Some(grade);
        self.mode = None;
        info!(grade = grade.number(), "Grade chosen");
    }

    /// Select the interaction mode once a grade is chosen.
    pub fn choose_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        if self.state() != SessionState::GradeChosen {
            return Err(self.invalid("choose a mode"));
        }
        self.mode = Some(mode);
        if mode == Mode::Chat {
            self.seed_chat_greeting();
        }
        info!(mode = %mode, "Mode chosen");
        Ok(())
    }

    /// Start guided practice on `topic`: counts the practice, seeds the greeting.
    ///
    /// The opening problem request is started separately with
    /// [`begin_opening_turn`](Self::begin_opening_turn).
    pub fn start_topic(&mut self, topic: &str) -> Result<(), SessionError> {
        if self.state() != SessionState::ActiveSelectingTopic {
            return Err(self.invalid("start a practice topic"));
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SessionError::EmptyTopic);
        }

        self.stats.record_practice(topic, Utc::now());
        self.active_topic = Some(topic.to_string());
        self.conversation = Conversation::new();
        self.conversation
            .push(Message::assistant(prompts::practice_greeting(topic)));
        info!(topic, "Guided practice started");
        Ok(())
    }

    /// Toggle between chat and guided practice, clearing the log.
    pub fn switch_mode(&mut self) -> Result<(), SessionError> {
        let Some(mode) = self.mode.filter(|_| self.grade.is_some()) else {
            return Err(self.invalid("switch mode"));
        };
        self.abandon_conversation();
        let next = mode.toggled();
        self.mode = Some(next);
        if next == Mode::Chat {
            self.seed_chat_greeting();
        }
        info!(mode = %next, "Mode switched");
        Ok(())
    }

    /// Step back one level in the selection flow.
    pub fn back(&mut self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::NoGrade => return Err(self.invalid("go back")),
            SessionState::GradeChosen => self.grade = None,
            _ => {
                self.abandon_conversation();
                self.mode = None;
            }
        }
        debug!(state = %self.state(), "Navigated back");
        Ok(())
    }

    /// Return to `NoGrade`. Topic statistics are kept.
    pub fn reset(&mut self) {
        self.abandon_conversation();
        self.grade = None;
        self.mode = None;
        self.last_error = None;
        info!("Session reset");
    }

    // ── Turns ─────────────────────────────────────────────────────────────

    fn ready(&mut self, kind: TurnKind, contents: Vec<Content>, credential: &str) -> Result<PendingTurn, SessionError> {
        let system_instruction = self
            .system_instruction()
            .ok_or_else(|| self.invalid("send a message"))?;
        self.in_flight = true;
        self.last_error = None;
        debug!(epoch = self.epoch, turns = contents.len(), ?kind, "Turn started");
        Ok(PendingTurn {
            epoch: self.epoch,
            kind,
            contents,
            system_instruction,
            credential: credential.to_string(),
        })
    }

    fn history(&self) -> Vec<Content> {
        self.conversation
            .messages()
            .iter()
            .map(|m| Content::text(m.role.wire_name(), m.content.clone()))
            .collect()
    }

    fn precondition(&self, credential: Option<&str>) -> Result<(), SkipReason> {
        if self.in_flight {
            return Err(SkipReason::InFlight);
        }
        match credential {
            Some(c) if !c.trim().is_empty() => Ok(()),
            _ => Err(SkipReason::NoCredential),
        }
    }

    /// Append a student turn and prepare its request.
    ///
    /// Earlier turns are sent as plain text; only this turn carries the
    /// attachment. Consuming the attachment releases its preview.
    pub fn begin_user_turn(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
        credential: Option<&str>,
    ) -> Result<TurnStart, SessionError> {
        if !self.state().accepts_messages() {
            return Err(self.invalid("send a message"));
        }

        let text = text.trim();
        let skip = if text.is_empty() && attachment.is_none() {
            Err(SkipReason::EmptyInput)
        } else {
            self.precondition(credential)
        };
        if let Err(reason) = skip {
            debug!(?reason, "Send skipped");
            return Ok(TurnStart::Skipped { reason, attachment });
        }
        let credential = credential.unwrap_or_default();

        let mut last_parts = None;
        match attachment {
            Some(attachment) => {
                let (summary, payload) = attachment.into_payload();
                let content = if text.is_empty() {
                    prompts::sent_file_placeholder(&summary.name)
                } else {
                    text.to_string()
                };
                last_parts = Some(match payload {
                    AttachmentPayload::Inline { mime_type, data } => {
                        let prompt = if text.is_empty() { prompts::INLINE_ATTACHMENT_PROMPT } else { text };
                        vec![Part::text(prompt), Part::inline(mime_type, data)]
                    }
                    AttachmentPayload::ExtractedText(extracted) => vec![Part::text(
                        prompts::extracted_text_turn(&summary.name, &extracted, text),
                    )],
                });
                self.conversation
                    .push(Message::user_with_attachment(content, summary));
            }
            None => self.conversation.push(Message::user(text)),
        }

        let mut contents = self.history();
        if let (Some(parts), Some(last)) = (last_parts, contents.last_mut()) {
            last.parts = parts;
        }

        self.ready(TurnKind::Student, contents, credential)
            .map(TurnStart::Ready)
    }

    /// Prepare the automatic request for an opening practice problem.
    ///
    /// The request text is not shown in the log.
    pub fn begin_opening_turn(&mut self, credential: Option<&str>) -> Result<TurnStart, SessionError> {
        let Some(topic) = self.active_topic.clone().filter(|_| self.state() == SessionState::ActivePractice) else {
            return Err(self.invalid("request an opening problem"));
        };
        if let Err(reason) = self.precondition(credential) {
            debug!(?reason, "Opening request skipped");
            return Ok(TurnStart::Skipped { reason, attachment: None });
        }

        let mut contents = self.history();
        contents.push(Content::text("user", prompts::opening_request(&topic)));
        self.ready(TurnKind::Opening, contents, credential.unwrap_or_default())
            .map(TurnStart::Ready)
    }

    /// Apply the model result for `pending`.
    ///
    /// On failure the error is kept in `last_error` and the log is left as
    /// is, including the already-appended student turn.
    pub fn complete_turn(
        &mut self,
        pending: &PendingTurn,
        result: Result<GenerateContentResponse, InvokeError>,
    ) -> Result<TurnOutcome, InvokeError> {
        if pending.epoch != self.epoch {
            debug!(turn_epoch = pending.epoch, epoch = self.epoch, "Discarding stale reply");
            return Ok(TurnOutcome::Stale);
        }
        self.in_flight = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Model request failed");
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let reply = response.first_text().to_string();
        let mut struggle_recorded = false;
        if pending.kind == TurnKind::Student {
            if let Some(topic) = &self.active_topic {
                if self.struggle_signal.indicates_struggle(&reply) {
                    self.stats.record_struggle(topic, Utc::now());
                    struggle_recorded = true;
                    info!(topic = %topic, "Struggle signal recorded");
                }
            }
        }

        let text = if reply.is_empty() {
            prompts::EMPTY_REPLY_FALLBACK.to_string()
        } else {
            reply
        };
        self.conversation.push(Message::assistant(text.clone()));

        Ok(TurnOutcome::Replied {
            text,
            struggle_recorded,
        })
    }
}

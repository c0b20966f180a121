//! # MathTutor Session
//!
//! The tutoring conversation: grade and mode selection, the message log,
//! guided practice topics, struggle tracking and the personalized system
//! instruction sent with every request.
//!
//! [`SessionController`] is a synchronous state machine that never performs
//! I/O. [`Tutor`] wraps it with the endpoint invoker, the preference store and
//! the attachment ingestor, and is what a front-end talks to.

pub mod personalization;
pub mod prompts;
pub mod session;
pub mod struggle;
pub mod tutor;

pub use personalization::{build_instruction, struggling_topics, STRUGGLE_THRESHOLD};
pub use session::{
    PendingTurn, SessionController, SessionState, SkipReason, TurnKind, TurnOutcome, TurnStart,
};
pub use struggle::{PhraseDetector, StruggleSignal};
pub use tutor::Tutor;

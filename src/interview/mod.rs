//! Guided interview engine.
//!
//! The [`conductor::InterviewConductor`] drives a session through four core
//! questions, one branch decision, and optional follow-ups, calling the
//! [`extractor`] after every answer and the [`branching`] generator once.
//! [`output`] turns the final fact list into an identity record, and
//! [`session`] keeps conductors resumable across process restarts.

pub mod branching;
pub mod conductor;
pub mod extractor;
pub mod output;
pub mod questions;
pub mod session;
pub mod types;

use thiserror::Error;

use types::InterviewStatus;

/// Errors surfaced to callers of the interview engine.
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("cannot {operation} while interview is {status}")]
    IllegalTransition {
        operation: &'static str,
        status: InterviewStatus,
    },

    #[error("no question is pending (interview is {status})")]
    NoPendingQuestion { status: InterviewStatus },

    #[error("unknown interview session: {0}")]
    UnknownSession(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

/// The substring from the first `open` to the last `close`, inclusive.
///
/// Model replies often wrap JSON in prose or code fences.
pub(crate) fn json_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

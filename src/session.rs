//! State of one question/answer session, independent of how it is rendered.
//!
//! Each accepted submission gets a generation number. A result is applied
//! only if it belongs to the latest submission, so a slow, superseded request
//! can never overwrite a newer answer or error.

use crate::ask::AskError;

/// Shown when a failed request carries no message of its own.
pub const FALLBACK_ERROR: &str = "Something went wrong while asking.";

/// Ticket for one submitted question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub generation: u64,
    /// The trimmed question to send.
    pub question: String,
}

#[derive(Debug, Default, Clone)]
pub struct AskSession {
    question: String,
    answer: Option<String>,
    error: Option<String>,
    loading: bool,
    generation: u64,
}

impl AskSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_question(&mut self, question: impl Into<String>) {
        self.question = question.into();
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether an interactive submit is allowed: non-blank input, nothing in flight.
    pub fn can_submit(&self) -> bool {
        !self.loading && !self.question.trim().is_empty()
    }

    /// Starts a submission for the current question.
    ///
    /// Blank input returns `None` and leaves the state untouched. Otherwise
    /// the previous answer and error are cleared and any in-flight
    /// submission is superseded.
    pub fn submit(&mut self) -> Option<Submission> {
        let question = self.question.trim();
        if question.is_empty() {
            return None;
        }
        let question = question.to_string();

        self.generation += 1;
        self.loading = true;
        self.answer = None;
        self.error = None;

        Some(Submission {
            generation: self.generation,
            question,
        })
    }

    /// Applies the outcome of `submission`.
    ///
    /// Returns `false` (and changes nothing) if a newer submission has been
    /// made since. `Ok(None)` only happens for blank questions and is treated
    /// like a completed request with nothing to show.
    pub fn resolve(
        &mut self,
        submission: &Submission,
        outcome: Result<Option<String>, AskError>,
    ) -> bool {
        if submission.generation != self.generation {
            tracing::debug!(
                stale = submission.generation,
                current = self.generation,
                "discarding superseded answer"
            );
            return false;
        }

        self.loading = false;
        match outcome {
            Ok(answer) => {
                self.answer = answer;
                self.error = None;
            }
            Err(e) => {
                let message = e.to_string();
                self.answer = None;
                self.error = Some(if message.trim().is_empty() {
                    FALLBACK_ERROR.to_string()
                } else {
                    message
                });
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_submit_changes_nothing() {
        let mut session = AskSession::new();
        session.set_question("first");
        let ticket = session.submit().unwrap();
        session.resolve(&ticket, Ok(Some("an answer".to_string())));

        session.set_question("  ");
        assert!(!session.can_submit());
        assert!(session.submit().is_none());
        assert_eq!(session.answer(), Some("an answer"));
        assert!(!session.is_loading());
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_submit_clears_previous_state() {
        let mut session = AskSession::new();
        session.set_question("q1");
        let ticket = session.submit().unwrap();
        session.resolve(&ticket, Err(AskError::Status(502)));
        assert!(session.error().is_some());

        session.set_question("  q2  ");
        let ticket = session.submit().unwrap();
        assert_eq!(ticket.question, "q2");
        assert!(session.is_loading());
        assert_eq!(session.error(), None);
        assert_eq!(session.answer(), None);
        assert!(!session.can_submit());
    }

    #[test]
    fn test_error_clears_answer_and_loading() {
        let mut session = AskSession::new();
        session.set_question("pricing");
        let ticket = session.submit().unwrap();

        assert!(session.resolve(&ticket, Err(AskError::Status(500))));
        assert!(!session.is_loading());
        assert_eq!(session.answer(), None);
        assert!(session.error().unwrap().contains("500"));
    }

    #[test]
    fn test_blank_error_message_uses_fallback() {
        let mut session = AskSession::new();
        session.set_question("pricing");
        let ticket = session.submit().unwrap();
        session.resolve(&ticket, Ok(Some("earlier".to_string())));

        let ticket = session.submit().unwrap();
        assert!(session.resolve(&ticket, Err(AskError::Decode(String::new()))));
        assert_eq!(session.error(), Some(FALLBACK_ERROR));
        assert_eq!(session.answer(), None);
    }

    #[test]
    fn test_stale_result_ignored() {
        let mut session = AskSession::new();
        session.set_question("old");
        let old = session.submit().unwrap();
        session.set_question("new");
        let new = session.submit().unwrap();

        assert!(session.resolve(&new, Ok(Some("new answer".to_string()))));
        assert!(!session.resolve(&old, Ok(Some("old answer".to_string()))));
        assert_eq!(session.answer(), Some("new answer"));

        assert!(!session.resolve(&old, Err(AskError::Status(500))));
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_stale_result_does_not_end_loading() {
        let mut session = AskSession::new();
        session.set_question("a");
        let old = session.submit().unwrap();
        session.set_question("b");
        let _new = session.submit().unwrap();

        session.resolve(&old, Ok(Some("a".to_string())));
        assert!(session.is_loading());
    }
}

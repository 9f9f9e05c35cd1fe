use formflow_spec::{Field, Outcome, Submission, drives_navigation};
use serde_json::Value;
use tracing::debug;

use crate::session::{FormSession, SessionError};
use crate::store::SubmissionSink;

/// Supplies an answer for a field given its current value; `None` leaves it unanswered.
pub type AnswerProvider<'a> =
    dyn FnMut(&Field, Option<&Value>) -> Result<Option<Value>, SessionError> + 'a;

pub struct SessionRunner;

impl SessionRunner {
    /// Walks the session section by section until it is submitted.
    pub fn run(
        session: &mut FormSession,
        provider: &mut AnswerProvider<'_>,
        sink: &dyn SubmissionSink,
    ) -> Result<Submission, SessionError> {
        let max_steps = (session.form().sections.len() + 1) * 4;

        for _ in 0..max_steps {
            match Self::fill_section(session, provider)? {
                Some(Outcome::Moved { .. }) => continue,
                Some(outcome) => return Self::finish(session, outcome, sink),
                None => {}
            }

            let outcome = session.next();
            debug!(?outcome, "next pressed");
            match outcome {
                Outcome::Moved { .. } => continue,
                other => return Self::finish(session, other, sink),
            }
        }

        Err(SessionError::Cycle(session.state().section_path.clone()))
    }

    /// Asks for every visible field, branching dropdowns last. Returns the
    /// outcome of an answer that ended or left the section.
    fn fill_section(
        session: &mut FormSession,
        provider: &mut AnswerProvider<'_>,
    ) -> Result<Option<Outcome>, SessionError> {
        let mut fields: Vec<Field> = session.visible_fields().into_iter().cloned().collect();
        fields.sort_by_key(|field| drives_navigation(session.form(), field));
        for field in &fields {
            let current = session.answers().get(&field.id).cloned();
            let Some(value) = provider(field, current.as_ref())? else {
                continue;
            };
            match session.set_answer(&field.id, value)? {
                Outcome::Stayed | Outcome::Refused { .. } => {}
                outcome => return Ok(Some(outcome)),
            }
        }
        Ok(None)
    }

    fn finish(
        session: &mut FormSession,
        outcome: Outcome,
        sink: &dyn SubmissionSink,
    ) -> Result<Submission, SessionError> {
        match outcome {
            Outcome::Submit { .. } => session.submit(sink),
            Outcome::CannotSubmitHere { .. } => Err(SessionError::SubmitNotAllowed),
            Outcome::Refused { reason } => Err(SessionError::Stalled(reason)),
            Outcome::Moved { .. } | Outcome::Stayed => {
                Err(SessionError::Cycle(session.state().section_path.clone()))
            }
        }
    }
}

use std::collections::BTreeMap;

use formflow_spec::{
    Answers, Event, Field, Form, NavigationState, Outcome, PruneReport, Refusal, Section,
    Submission, SubmitRejection, ValidationReport, advance, can_proceed_to_next, can_submit,
    current_section, is_at_end_of_visited_path, prepare_submission, prune, submit_available,
    visible_fields,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{FormSource, StoreError, SubmissionSink};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("form '{form_id}' is unavailable: {source}")]
    FormUnavailable {
        form_id: String,
        #[source]
        source: StoreError,
    },
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("{} field(s) failed validation", .0.errors.len())]
    Invalid(ValidationReport),
    #[error("submitting is not allowed from this section")]
    SubmitNotAllowed,
    #[error("form already submitted")]
    AlreadySubmitted,
    #[error("could not store submission: {0}")]
    Persistence(#[source] StoreError),
    #[error("cannot continue: {0}")]
    Stalled(Refusal),
    #[error("navigation loops through {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("answer provider failed: {0}")]
    Provider(String),
}

impl SessionError {
    /// Persistence failures leave the session intact and may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// One respondent filling one form.
#[derive(Debug, Clone)]
pub struct FormSession {
    form: Form,
    answers: Answers,
    state: NavigationState,
    errors: BTreeMap<String, String>,
    prune_report: PruneReport,
}

impl FormSession {
    /// Starts a session; stale rules and dangling references are pruned first.
    pub fn new(mut form: Form) -> Self {
        let prune_report = prune(&mut form);
        if !prune_report.is_clean() {
            warn!(
                form = %form.id,
                removed = prune_report.total(),
                "form carried stale references"
            );
        }
        let state = NavigationState::start(&form);
        Self {
            form,
            answers: Answers::new(),
            state,
            errors: BTreeMap::new(),
            prune_report,
        }
    }

    pub fn open(source: &dyn FormSource, form_id: &str) -> Result<Self, SessionError> {
        source
            .load_form(form_id)
            .map(Self::new)
            .map_err(|source| SessionError::FormUnavailable {
                form_id: form_id.to_string(),
                source,
            })
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Messages from the last rejected submit, minus fields edited since.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn prune_report(&self) -> PruneReport {
        self.prune_report
    }

    pub fn current_section(&self) -> Option<&Section> {
        current_section(&self.form, &self.state)
    }

    pub fn visible_fields(&self) -> Vec<&Field> {
        visible_fields(&self.form, &self.state)
    }

    pub fn can_proceed(&self) -> bool {
        can_proceed_to_next(&self.form, &self.answers, &self.state)
    }

    pub fn can_submit(&self) -> bool {
        can_submit(&self.form, &self.answers, &self.state)
    }

    pub fn submit_available(&self) -> bool {
        submit_available(&self.form, &self.state)
    }

    pub fn is_at_end_of_path(&self) -> bool {
        is_at_end_of_visited_path(&self.form, &self.state)
    }

    pub fn is_submitted(&self) -> bool {
        self.state.is_submitted()
    }

    /// Records an answer and lets a matching branch move the session.
    pub fn set_answer(&mut self, field_id: &str, value: Value) -> Result<Outcome, SessionError> {
        if self.state.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.form.field(field_id).is_none() {
            return Err(SessionError::UnknownField(field_id.to_string()));
        }
        self.answers.insert(field_id.to_string(), value);
        self.errors.remove(field_id);
        let step = advance(
            &self.form,
            &self.answers,
            &self.state,
            Event::Answered { field_id },
        );
        self.state = step.state;
        Ok(step.outcome)
    }

    pub fn next(&mut self) -> Outcome {
        let step = advance(&self.form, &self.answers, &self.state, Event::Next);
        self.state = step.state;
        step.outcome
    }

    /// Validates the visited path and hands the answers to `sink`. On failure
    /// answers and navigation state are left as they were.
    pub fn submit(&mut self, sink: &dyn SubmissionSink) -> Result<Submission, SessionError> {
        let data = match prepare_submission(&self.form, &self.answers, &self.state) {
            Ok(data) => data,
            Err(SubmitRejection::Invalid(report)) => {
                self.errors = report.errors.clone();
                return Err(SessionError::Invalid(report));
            }
            Err(SubmitRejection::NotAllowedHere) => return Err(SessionError::SubmitNotAllowed),
            Err(SubmitRejection::AlreadySubmitted) => return Err(SessionError::AlreadySubmitted),
        };

        let submission = sink
            .submit(&self.form.id, data)
            .map_err(SessionError::Persistence)?;
        self.state = self.state.mark_submitted();
        self.errors.clear();
        info!(
            form = %self.form.id,
            submission = %submission.id,
            path = ?self.state.section_path,
            "form submitted"
        );
        Ok(submission)
    }
}

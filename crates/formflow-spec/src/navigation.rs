//! Section navigation state machine.
//!
//! Every call takes the previous [`NavigationState`] by reference and returns a
//! new one alongside the [`Outcome`]; the input state is never modified. The
//! destination of a step is found by walking an ordered chain of [`Route`]s,
//! where each route either names a destination or has no opinion.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::answers::{Answers, ValidationReport, is_empty_answer};
use crate::prune::rule_is_live;
use crate::resolver::resolve_branch;
use crate::spec::{Field, Form, Section, SectionTarget};
use crate::validate::validate_scoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InSection,
    Submitted,
}

/// Per-session navigation state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub current_section_index: usize,
    /// Sections reached so far; only these are validated.
    pub visited_sections: BTreeSet<String>,
    /// Sections in the order they were entered.
    pub section_path: Vec<String>,
    pub phase: Phase,
}

impl NavigationState {
    /// Fresh state positioned on the lowest-order section.
    pub fn start(form: &Form) -> Self {
        let mut state = Self {
            current_section_index: 0,
            visited_sections: BTreeSet::new(),
            section_path: Vec::new(),
            phase: Phase::InSection,
        };
        if let Some(first) = form.first_section() {
            state.visited_sections.insert(first.id.clone());
            state.section_path.push(first.id.clone());
        }
        state
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == Phase::Submitted
    }

    pub fn has_visited(&self, section_id: &str) -> bool {
        self.visited_sections.contains(section_id)
    }

    /// Terminal state, entered once the submission was persisted.
    pub fn mark_submitted(&self) -> Self {
        let mut next = self.clone();
        next.phase = Phase::Submitted;
        next
    }

    fn enter(&self, form: &Form, index: usize) -> Self {
        let mut next = self.clone();
        if let Some(section) = form.section_at(index) {
            next.visited_sections.insert(section.id.clone());
            next.section_path.push(section.id.clone());
        }
        next.current_section_index = index;
        next
    }
}

/// Respondent input that may move the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// Explicit "Next" press.
    Next,
    /// An answer was recorded for this field.
    Answered { field_id: &'a str },
}

/// Strategies for picking the next destination, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    BranchTrigger,
    ConfiguredNext,
    VisitedFallback,
    SequentialFallback,
    Terminal,
}

/// Chain consulted on a "Next" press. Branch rules fire on answer entry only,
/// so a stale dropdown answer never overrides `nextSectionId`.
pub const NEXT_CHAIN: [Route; 4] = [
    Route::ConfiguredNext,
    Route::VisitedFallback,
    Route::SequentialFallback,
    Route::Terminal,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Section(usize),
    Submit,
}

struct RouteContext<'a> {
    form: &'a Form,
    answers: &'a Answers,
    state: &'a NavigationState,
    ordered: Vec<&'a Section>,
    /// Set when routing in response to a single answered field.
    answered: Option<&'a str>,
}

impl<'a> RouteContext<'a> {
    fn new(
        form: &'a Form,
        answers: &'a Answers,
        state: &'a NavigationState,
        answered: Option<&'a str>,
    ) -> Self {
        Self {
            form,
            answers,
            state,
            ordered: form.ordered_sections(),
            answered,
        }
    }

    fn current(&self) -> usize {
        self.state.current_section_index
    }

    fn current_section(&self) -> Option<&'a Section> {
        self.ordered.get(self.current()).copied()
    }

    fn index_of(&self, section_id: &str) -> Option<usize> {
        self.ordered
            .iter()
            .position(|section| section.id == section_id)
    }

    fn target(&self, target: &SectionTarget) -> Option<Destination> {
        match target {
            SectionTarget::End => Some(Destination::Submit),
            SectionTarget::Section(id) => self.index_of(id).map(Destination::Section),
        }
    }
}

impl Route {
    fn resolve(self, ctx: &RouteContext<'_>) -> Option<Destination> {
        match self {
            Route::BranchTrigger => {
                let field_id = ctx.answered?;
                let field = ctx
                    .form
                    .fields_at(ctx.current())
                    .into_iter()
                    .find(|field| field.id == field_id)?;
                let value = ctx.answers.get(&field.id)?.as_str()?;
                ctx.target(resolve_branch(ctx.form, field, value)?)
            }
            Route::ConfiguredNext => ctx
                .current_section()
                .and_then(|section| section.next_section_id.as_ref())
                .and_then(|target| ctx.target(target)),
            Route::VisitedFallback => (ctx.current() + 1..ctx.ordered.len())
                .find(|&index| ctx.state.has_visited(&ctx.ordered[index].id))
                .map(Destination::Section),
            Route::SequentialFallback => {
                let next = ctx.current() + 1;
                (next < ctx.ordered.len()).then_some(Destination::Section(next))
            }
            Route::Terminal => Some(Destination::Submit),
        }
    }
}

/// Why the engine stayed in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refusal {
    /// The current section has `allowNext` switched off.
    NextDisabled,
    MissingRequired { fields: Vec<String> },
    /// Branching dropdowns must be answered; their answer decides the route.
    BranchPending { fields: Vec<String> },
    Finished,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::NextDisabled => f.write_str("next is disabled for this section"),
            Refusal::MissingRequired { fields } => {
                write!(f, "required fields unanswered: {}", fields.join(", "))
            }
            Refusal::BranchPending { fields } => {
                write!(f, "choose an option first: {}", fields.join(", "))
            }
            Refusal::Finished => f.write_str("form already submitted"),
        }
    }
}

/// Result of a single navigation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Moved { from: usize, to: usize, route: Route },
    /// Nothing to do (an answer without a matching branch).
    Stayed,
    Refused { reason: Refusal },
    /// The path ended and this section may submit.
    Submit { route: Route },
    /// The path ended but this section does not allow submitting.
    CannotSubmitHere { route: Route },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub state: NavigationState,
    pub outcome: Outcome,
}

impl Advance {
    fn stay(state: &NavigationState, outcome: Outcome) -> Self {
        Self {
            state: state.clone(),
            outcome,
        }
    }

    fn refused(state: &NavigationState, reason: Refusal) -> Self {
        debug!(%reason, index = state.current_section_index, "navigation refused");
        Self::stay(state, Outcome::Refused { reason })
    }
}

/// Applies one event and returns the next state.
pub fn advance(
    form: &Form,
    answers: &Answers,
    state: &NavigationState,
    event: Event<'_>,
) -> Advance {
    if state.is_submitted() {
        return Advance::refused(state, Refusal::Finished);
    }

    match event {
        Event::Next => {
            if current_section(form, state).is_some_and(|section| !section.allow_next) {
                return Advance::refused(state, Refusal::NextDisabled);
            }
            if let Err(reason) = guard(form, answers, state) {
                return Advance::refused(state, reason);
            }
            let ctx = RouteContext::new(form, answers, state, None);
            NEXT_CHAIN
                .iter()
                .find_map(|route| route.resolve(&ctx).map(|dest| (*route, dest)))
                .map(|(route, dest)| apply(form, state, route, dest))
                .unwrap_or_else(|| Advance::stay(state, Outcome::Stayed))
        }
        Event::Answered { field_id } => {
            let ctx = RouteContext::new(form, answers, state, Some(field_id));
            // Answer entry is not guarded; the section stays visited and validated.
            match Route::BranchTrigger.resolve(&ctx) {
                Some(dest) => apply(form, state, Route::BranchTrigger, dest),
                None => Advance::stay(state, Outcome::Stayed),
            }
        }
    }
}

fn apply(form: &Form, state: &NavigationState, route: Route, dest: Destination) -> Advance {
    match dest {
        Destination::Section(to) => {
            let next = state.enter(form, to);
            debug!(
                from = state.current_section_index,
                to,
                ?route,
                path = ?next.section_path,
                "moved to section"
            );
            Advance {
                state: next,
                outcome: Outcome::Moved {
                    from: state.current_section_index,
                    to,
                    route,
                },
            }
        }
        Destination::Submit if submit_gate(form, state) => {
            debug!(?route, path = ?state.section_path, "end of path reached");
            Advance::stay(state, Outcome::Submit { route })
        }
        Destination::Submit => {
            debug!(
                ?route,
                index = state.current_section_index,
                "end of path but submit not allowed here"
            );
            Advance::stay(state, Outcome::CannotSubmitHere { route })
        }
    }
}

/// Required fields and branching dropdowns of the current section must be answered.
fn guard(form: &Form, answers: &Answers, state: &NavigationState) -> Result<(), Refusal> {
    let fields = form.fields_at(state.current_section_index);
    let unanswered = |field: &&Field| is_empty_answer(answers.get(&field.id));

    let missing: Vec<String> = fields
        .iter()
        .copied()
        .filter(|field| field.required)
        .filter(unanswered)
        .map(|field| field.id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(Refusal::MissingRequired { fields: missing });
    }

    let pending: Vec<String> = fields
        .iter()
        .copied()
        .filter(|field| drives_navigation(form, field))
        .filter(unanswered)
        .map(|field| field.id.clone())
        .collect();
    if !pending.is_empty() {
        return Err(Refusal::BranchPending { fields: pending });
    }
    Ok(())
}

/// A dropdown with at least one rule that can still fire.
pub fn drives_navigation(form: &Form, field: &Field) -> bool {
    field.is_branching()
        && field
            .rules()
            .iter()
            .any(|rule| rule_is_live(form, field, &rule.answer, &rule.target_section_id))
}

/// Single-section (and section-less) forms can always submit.
fn submit_gate(form: &Form, state: &NavigationState) -> bool {
    form.sections.len() <= 1
        || current_section(form, state).is_some_and(|section| section.allow_submit)
}

pub fn current_section<'a>(form: &'a Form, state: &NavigationState) -> Option<&'a Section> {
    form.section_at(state.current_section_index)
}

pub fn visible_fields<'a>(form: &'a Form, state: &NavigationState) -> Vec<&'a Field> {
    form.fields_at(state.current_section_index)
}

/// Whether a "Next" press would be accepted.
pub fn can_proceed_to_next(form: &Form, answers: &Answers, state: &NavigationState) -> bool {
    !state.is_submitted()
        && current_section(form, state).is_none_or(|section| section.allow_next)
        && guard(form, answers, state).is_ok()
}

/// No visited section lies beyond the current one.
pub fn is_at_end_of_visited_path(form: &Form, state: &NavigationState) -> bool {
    form.ordered_sections()
        .iter()
        .skip(state.current_section_index + 1)
        .all(|section| !state.has_visited(&section.id))
}

/// Whether a submit control belongs on the current section.
pub fn submit_available(form: &Form, state: &NavigationState) -> bool {
    form.sections.len() <= 1
        || (is_at_end_of_visited_path(form, state)
            && current_section(form, state).is_some_and(|section| section.allow_submit))
}

/// Submit gate plus scoped validation.
pub fn can_submit(form: &Form, answers: &Answers, state: &NavigationState) -> bool {
    !state.is_submitted()
        && submit_gate(form, state)
        && validate_scoped(form, answers, &state.visited_sections).is_valid()
}

/// Why a submission was not produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitRejection {
    NotAllowedHere,
    Invalid(ValidationReport),
    AlreadySubmitted,
}

/// Finalizes answers for persistence, keeping only fields the form defines.
/// The state is not advanced; call [`NavigationState::mark_submitted`] once
/// the submission has been stored.
pub fn prepare_submission(
    form: &Form,
    answers: &Answers,
    state: &NavigationState,
) -> Result<Answers, SubmitRejection> {
    if state.is_submitted() {
        return Err(SubmitRejection::AlreadySubmitted);
    }
    if !submit_gate(form, state) {
        return Err(SubmitRejection::NotAllowedHere);
    }
    let report = validate_scoped(form, answers, &state.visited_sections);
    if !report.is_valid() {
        return Err(SubmitRejection::Invalid(report));
    }
    Ok(answers
        .iter()
        .filter(|(field_id, _)| form.field(field_id).is_some())
        .map(|(field_id, value)| (field_id.clone(), value.clone()))
        .collect())
}

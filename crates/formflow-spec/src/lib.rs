#![allow(missing_docs)]

pub mod answers;
pub mod editor;
pub mod navigation;
pub mod prune;
pub mod resolver;
pub mod spec;
pub mod validate;

pub use answers::{Answers, Submission, UploadedFile, ValidationReport, is_empty_answer};
pub use editor::EditError;
pub use navigation::{
    Advance, Event, NEXT_CHAIN, NavigationState, Outcome, Phase, Refusal, Route, SubmitRejection,
    advance, can_proceed_to_next, can_submit, current_section, drives_navigation,
    is_at_end_of_visited_path, prepare_submission, submit_available, visible_fields,
};
pub use prune::{PruneReport, SchemaIssue, check, prune};
pub use resolver::{match_rule, resolve_branch};
pub use spec::{
    Column, ConditionalLogic, ConditionalRule, END_TARGET, Field, FieldType, Form, Section,
    SectionTarget, TableColumn, TableColumnType, TextValidation,
};
pub use validate::{REQUIRED_MESSAGE, validate_field, validate_scoped};

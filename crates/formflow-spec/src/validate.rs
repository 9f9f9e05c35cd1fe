use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::answers::{Answers, ValidationReport, is_empty_answer};
use crate::spec::{Field, FieldType, Form};

pub const REQUIRED_MESSAGE: &str = "This field is required";

/// Validates every field on the visited path. Unsectioned fields (and those
/// whose section is gone) are always checked; fields of sections the
/// respondent never reached are skipped.
pub fn validate_scoped(
    form: &Form,
    answers: &Answers,
    visited: &BTreeSet<String>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for field in &form.fields {
        let in_scope = match field.section_id.as_deref() {
            Some(section_id) if form.has_section(section_id) => visited.contains(section_id),
            _ => true,
        };
        if !in_scope {
            report.skipped.push(field.id.clone());
            continue;
        }
        if let Some(message) = validate_field(field, answers.get(&field.id)) {
            report.errors.insert(field.id.clone(), message);
        }
    }

    debug!(
        form = %form.id,
        checked = form.fields.len() - report.skipped.len(),
        skipped = report.skipped.len(),
        errors = report.errors.len(),
        "scoped validation"
    );
    report
}

/// First violated constraint of a single field, if any.
pub fn validate_field(field: &Field, value: Option<&Value>) -> Option<String> {
    if is_empty_answer(value) {
        return field.required.then(|| REQUIRED_MESSAGE.to_string());
    }

    if field.kind == FieldType::Text
        && let Some(bounds) = field.validation
        && let Some(text) = value.and_then(Value::as_str)
    {
        let length = text.chars().count();
        // A bound of 0 means no limit.
        if let Some(max) = bounds.max_length.filter(|&max| max > 0)
            && length > max
        {
            return Some(format!("Maximum length is {max} characters"));
        }
        if let Some(min) = bounds.min_length.filter(|&min| min > 0)
            && length < min
        {
            return Some(format!("Minimum length is {min} characters"));
        }
    }

    None
}

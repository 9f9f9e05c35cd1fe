use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Respondent answers keyed by field id.
pub type Answers = Map<String, Value>;

/// Absent, `null`, `""` and `[]` all count as unanswered.
pub fn is_empty_answer(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Descriptor stored as the answer of a file field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub filename: String,
    pub original_name: String,
    pub path: String,
}

/// Finalized answers handed to persistence. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    #[schemars(with = "BTreeMap<String, Value>")]
    pub data: Answers,
    pub submitted_at: String,
}

impl Submission {
    /// Stamps a fresh id and the current UTC time.
    pub fn new(form_id: impl Into<String>, data: Answers) -> Self {
        let submitted_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form_id.into(),
            data,
            submitted_at,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Outcome of scoped validation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    /// Field id to message for every violated constraint.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    /// Fields left unchecked because their section was never visited.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_for(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }
}

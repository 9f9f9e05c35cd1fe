use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::target::{SectionTarget, deserialize_optional_target};

/// Layout column; `width` is a percentage of the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default)]
    pub field_ids: Vec<String>,
}

impl Column {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            width: default_width(),
            field_ids: Vec::new(),
        }
    }
}

/// Ordered page of fields with its own navigation flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: i64,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default = "default_true")]
    pub allow_submit: bool,
    #[serde(default = "default_true")]
    pub allow_next: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_target",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub next_section_id: Option<SectionTarget>,
}

impl Section {
    /// Section with default flags: submit and next allowed, sequential routing.
    pub fn new(id: impl Into<String>, title: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            order,
            columns: Vec::new(),
            allow_submit: true,
            allow_next: true,
            next_section_id: None,
        }
    }

    pub fn with_next(mut self, target: impl Into<SectionTarget>) -> Self {
        self.next_section_id = Some(target.into());
        self
    }

    pub fn with_flags(mut self, allow_submit: bool, allow_next: bool) -> Self {
        self.allow_submit = allow_submit;
        self.allow_next = allow_next;
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_width() -> f64 {
    100.0
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::target::SectionTarget;

/// Widget kinds a field can render as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Dropdown,
    Table,
    File,
}

impl FieldType {
    /// Kinds whose answers are arrays (rows or uploaded files).
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Self::Table | Self::File)
    }
}

/// Length bounds enforced on text answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableColumnType {
    Text,
    Dropdown,
}

/// Column of a table field; each answer row is keyed by column id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableColumn {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TableColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Routes the respondent elsewhere when a dropdown answer matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    pub answer: String,
    #[schemars(with = "String")]
    pub target_section_id: SectionTarget,
}

impl ConditionalRule {
    pub fn new(answer: impl Into<String>, target: impl Into<SectionTarget>) -> Self {
        Self {
            answer: answer.into(),
            target_section_id: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConditionalLogic {
    #[serde(default)]
    pub conditions: Vec<ConditionalRule>,
}

/// Single question of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub question: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<TextValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_columns: Option<Vec<TableColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<ConditionalLogic>,
}

impl Field {
    pub fn new(id: impl Into<String>, kind: FieldType, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            question: question.into(),
            required: false,
            column_id: None,
            section_id: None,
            validation: None,
            options: None,
            table_columns: None,
            conditional_logic: None,
        }
    }

    pub fn text(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self::new(id, FieldType::Text, question)
    }

    pub fn dropdown<I, S>(id: impl Into<String>, question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(id, FieldType::Dropdown, question);
        field.options = Some(options.into_iter().map(Into::into).collect());
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn in_section(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    pub fn with_length(mut self, min_length: Option<usize>, max_length: Option<usize>) -> Self {
        self.validation = Some(TextValidation {
            min_length,
            max_length,
        });
        self
    }

    pub fn with_rule(mut self, rule: ConditionalRule) -> Self {
        self.conditional_logic
            .get_or_insert_with(ConditionalLogic::default)
            .conditions
            .push(rule);
        self
    }

    /// Conditional rules in declaration order; empty when none are configured.
    pub fn rules(&self) -> &[ConditionalRule] {
        self.conditional_logic
            .as_ref()
            .map(|logic| logic.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options
            .as_ref()
            .is_some_and(|options| options.iter().any(|option| option == value))
    }

    /// A dropdown carrying rules drives navigation through its answer.
    pub fn is_branching(&self) -> bool {
        self.kind == FieldType::Dropdown && !self.rules().is_empty()
    }
}

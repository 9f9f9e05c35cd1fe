use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::Field;
use crate::spec::section::{Column, Section};
use crate::spec::target::SectionTarget;

/// Top-level form definition produced by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Top-level layout from before sections existed.
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Form {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Vec::new(),
            columns: Vec::new(),
            sections: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Sections by ascending `order`; equal orders keep their list position.
    pub fn ordered_sections(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.iter().collect();
        sections.sort_by_key(|section| section.order);
        sections
    }

    /// Position of a section in `ordered_sections`.
    pub fn section_index(&self, section_id: &str) -> Option<usize> {
        self.ordered_sections()
            .iter()
            .position(|section| section.id == section_id)
    }

    pub fn section_at(&self, index: usize) -> Option<&Section> {
        self.ordered_sections().get(index).copied()
    }

    pub fn first_section(&self) -> Option<&Section> {
        self.section_at(0)
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == section_id)
    }

    pub fn has_section(&self, section_id: &str) -> bool {
        self.section(section_id).is_some()
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    /// Whether a target still points somewhere reachable.
    pub fn resolves(&self, target: &SectionTarget) -> bool {
        match target {
            SectionTarget::End => true,
            SectionTarget::Section(id) => self.has_section(id),
        }
    }

    /// Fields shown on the section at `index`. Unsectioned fields (and fields
    /// pointing at a missing section) live on the first section; with no
    /// sections at all every field is shown.
    pub fn fields_at(&self, index: usize) -> Vec<&Field> {
        let ordered = self.ordered_sections();
        let Some(section) = ordered.get(index) else {
            return if ordered.is_empty() {
                self.fields.iter().collect()
            } else {
                Vec::new()
            };
        };
        self.fields
            .iter()
            .filter(|field| match field.section_id.as_deref() {
                Some(section_id) if self.has_section(section_id) => section_id == section.id,
                _ => index == 0,
            })
            .collect()
    }
}

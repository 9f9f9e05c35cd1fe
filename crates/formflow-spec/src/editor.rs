//! Lifecycle operations the form editor performs on a definition.

use std::collections::BTreeSet;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::prune::{PruneReport, prune};
use crate::spec::{Field, Form, Section, SectionTarget};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("a form needs at least one section")]
    LastSection,
    #[error("unknown section '{0}'")]
    UnknownSection(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' already exists")]
    DuplicateField(String),
    #[error("section order must list every section exactly once")]
    InvalidOrder,
}

impl Form {
    /// Appends a section after the current last one and returns its id.
    pub fn add_section(&mut self, title: impl Into<String>) -> String {
        let order = self
            .sections
            .iter()
            .map(|section| section.order)
            .max()
            .map_or(1, |max| max + 1);
        let id = uuid::Uuid::new_v4().to_string();
        self.sections.push(Section::new(id.clone(), title, order));
        id
    }

    pub fn update_section_flags(
        &mut self,
        section_id: &str,
        allow_submit: bool,
        allow_next: bool,
        next_section_id: Option<SectionTarget>,
    ) -> Result<(), EditError> {
        let section = self
            .sections
            .iter_mut()
            .find(|section| section.id == section_id)
            .ok_or_else(|| EditError::UnknownSection(section_id.to_string()))?;
        section.allow_submit = allow_submit;
        section.allow_next = allow_next;
        section.next_section_id = next_section_id;
        Ok(())
    }

    /// Removes a section; its fields stay in the form without a section.
    pub fn delete_section(&mut self, section_id: &str) -> Result<(), EditError> {
        if !self.has_section(section_id) {
            return Err(EditError::UnknownSection(section_id.to_string()));
        }
        if self.sections.len() <= 1 {
            return Err(EditError::LastSection);
        }
        self.sections.retain(|section| section.id != section_id);
        let mut orphaned = 0usize;
        for field in &mut self.fields {
            if field.section_id.as_deref() == Some(section_id) {
                field.section_id = None;
                orphaned += 1;
            }
        }
        debug!(section = %section_id, orphaned, "section deleted");
        Ok(())
    }

    /// Renumbers `order` as 1..=n following `section_ids`.
    pub fn reorder_sections(&mut self, section_ids: &[&str]) -> Result<(), EditError> {
        let given: BTreeSet<&str> = section_ids.iter().copied().collect();
        let existing: BTreeSet<&str> = self.sections.iter().map(|s| s.id.as_str()).collect();
        if given.len() != section_ids.len() || given != existing {
            return Err(EditError::InvalidOrder);
        }
        for (position, id) in section_ids.iter().enumerate() {
            if let Some(section) = self.sections.iter_mut().find(|s| s.id == *id) {
                section.order = position as i64 + 1;
            }
        }
        Ok(())
    }

    pub fn add_field(&mut self, field: Field) -> Result<(), EditError> {
        if self.field(&field.id).is_some() {
            return Err(EditError::DuplicateField(field.id));
        }
        if let Some(section_id) = &field.section_id
            && !self.has_section(section_id)
        {
            return Err(EditError::UnknownSection(section_id.clone()));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Removes a field and every column entry pointing at it.
    pub fn delete_field(&mut self, field_id: &str) -> Result<Field, EditError> {
        let position = self
            .fields
            .iter()
            .position(|field| field.id == field_id)
            .ok_or_else(|| EditError::UnknownField(field_id.to_string()))?;
        let removed = self.fields.remove(position);
        let columns = self
            .columns
            .iter_mut()
            .chain(self.sections.iter_mut().flat_map(|s| s.columns.iter_mut()));
        for column in columns {
            column.field_ids.retain(|id| id != field_id);
        }
        Ok(removed)
    }

    pub fn move_field_to_section(
        &mut self,
        field_id: &str,
        section_id: &str,
    ) -> Result<(), EditError> {
        if !self.has_section(section_id) {
            return Err(EditError::UnknownSection(section_id.to_string()));
        }
        let field = self
            .fields
            .iter_mut()
            .find(|field| field.id == field_id)
            .ok_or_else(|| EditError::UnknownField(field_id.to_string()))?;
        field.section_id = Some(section_id.to_string());
        Ok(())
    }

    /// Prunes stale references and stamps timestamps before storage.
    pub fn prepare_for_save(&mut self) -> PruneReport {
        let report = prune(self);
        let now = OffsetDateTime::now_utc().format(&Rfc3339).ok();
        if self.created_at.is_none() {
            self.created_at = now.clone();
        }
        self.updated_at = now;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Column, ConditionalRule};

    fn form() -> Form {
        Form::new("f", "F")
            .with_section(Section::new("s1", "One", 1))
            .with_section(Section::new("s2", "Two", 2))
            .with_field(Field::text("a", "A").in_section("s2"))
    }

    #[test]
    fn deleting_last_section_is_refused() {
        let mut form = Form::new("f", "F").with_section(Section::new("s1", "One", 1));
        assert_eq!(form.delete_section("s1"), Err(EditError::LastSection));
        assert_eq!(form.sections.len(), 1);
    }

    #[test]
    fn deleting_section_orphans_fields() {
        let mut form = form();
        form.delete_section("s2").unwrap();
        assert_eq!(form.sections.len(), 1);
        assert_eq!(form.field("a").unwrap().section_id, None);
    }

    #[test]
    fn stale_branch_target_is_dropped_on_save() {
        let mut form = form().with_field(
            Field::dropdown("pick", "Pick", ["Yes"])
                .in_section("s1")
                .with_rule(ConditionalRule::new("Yes", "s2")),
        );
        form.delete_section("s2").unwrap();
        let report = form.prepare_for_save();
        assert_eq!(report.rules_removed, 1);
        assert!(form.created_at.is_some());
        assert_eq!(form.created_at, form.updated_at);
    }

    #[test]
    fn add_section_appends_after_highest_order() {
        let mut form = form();
        let id = form.add_section("Three");
        assert_eq!(form.section(&id).unwrap().order, 3);
        assert_eq!(form.ordered_sections().last().unwrap().id, id);
    }

    #[test]
    fn reorder_requires_a_permutation() {
        let mut form = form();
        assert_eq!(form.reorder_sections(&["s1"]), Err(EditError::InvalidOrder));
        assert_eq!(
            form.reorder_sections(&["s1", "s1"]),
            Err(EditError::InvalidOrder)
        );
        form.reorder_sections(&["s2", "s1"]).unwrap();
        assert_eq!(form.first_section().unwrap().id, "s2");
    }

    #[test]
    fn delete_field_cleans_columns() {
        let mut form = form();
        let mut column = Column::new("c", "Col");
        column.field_ids = vec!["a".into()];
        form.sections[1].columns.push(column);
        let removed = form.delete_field("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(form.sections[1].columns[0].field_ids.is_empty());
        assert_eq!(
            form.delete_field("a"),
            Err(EditError::UnknownField("a".into()))
        );
    }

    #[test]
    fn add_field_rejects_unknown_section_and_duplicates() {
        let mut form = form();
        assert_eq!(
            form.add_field(Field::text("b", "B").in_section("nope")),
            Err(EditError::UnknownSection("nope".into()))
        );
        assert_eq!(
            form.add_field(Field::text("a", "A")),
            Err(EditError::DuplicateField("a".into()))
        );
        form.add_field(Field::text("b", "B")).unwrap();
        form.move_field_to_section("b", "s1").unwrap();
        assert_eq!(form.field("b").unwrap().section_id.as_deref(), Some("s1"));
    }
}

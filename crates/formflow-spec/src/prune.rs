//! Schema integrity: dangling references left behind by editing history are
//! dropped rather than raised.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spec::{Field, FieldType, Form, SectionTarget};

/// Counts of everything `prune` removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PruneReport {
    pub rules_removed: usize,
    pub section_refs_cleared: usize,
    pub column_refs_cleared: usize,
    pub next_targets_cleared: usize,
    pub column_entries_removed: usize,
}

impl PruneReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    pub fn total(&self) -> usize {
        self.rules_removed
            + self.section_refs_cleared
            + self.column_refs_cleared
            + self.next_targets_cleared
            + self.column_entries_removed
    }
}

/// Whether a rule can still fire: its answer is an option and its target exists.
pub fn rule_is_live(form: &Form, field: &Field, answer: &str, target: &SectionTarget) -> bool {
    field.kind == FieldType::Dropdown && field.has_option(answer) && form.resolves(target)
}

/// Drops stale rules and clears dangling section, column and next references.
pub fn prune(form: &mut Form) -> PruneReport {
    let mut report = PruneReport::default();
    let section_ids: BTreeSet<String> = form.sections.iter().map(|s| s.id.clone()).collect();
    let mut column_ids: BTreeSet<String> = form.columns.iter().map(|c| c.id.clone()).collect();
    for section in &form.sections {
        column_ids.extend(section.columns.iter().map(|c| c.id.clone()));
    }

    let target_exists = |target: &SectionTarget| match target {
        SectionTarget::End => true,
        SectionTarget::Section(id) => section_ids.contains(id),
    };

    for field in &mut form.fields {
        let is_dropdown = field.kind == FieldType::Dropdown;
        let options = field.options.clone().unwrap_or_default();
        if let Some(logic) = field.conditional_logic.as_mut() {
            let before = logic.conditions.len();
            logic.conditions.retain(|rule| {
                is_dropdown
                    && options.contains(&rule.answer)
                    && target_exists(&rule.target_section_id)
            });
            let removed = before - logic.conditions.len();
            if removed > 0 {
                debug!(
                    field = %field.id,
                    before,
                    kept = logic.conditions.len(),
                    "pruned conditional rules"
                );
            }
            report.rules_removed += removed;
            if logic.conditions.is_empty() {
                field.conditional_logic = None;
            }
        }

        if field
            .section_id
            .as_ref()
            .is_some_and(|id| !section_ids.contains(id))
        {
            debug!(field = %field.id, "cleared dangling section reference");
            field.section_id = None;
            report.section_refs_cleared += 1;
        }

        if field
            .column_id
            .as_ref()
            .is_some_and(|id| !column_ids.contains(id))
        {
            field.column_id = None;
            report.column_refs_cleared += 1;
        }
    }

    for section in &mut form.sections {
        if let Some(SectionTarget::Section(id)) = &section.next_section_id
            && !section_ids.contains(id)
        {
            debug!(section = %section.id, target = %id, "cleared dangling next section");
            section.next_section_id = None;
            report.next_targets_cleared += 1;
        }
    }

    let field_ids: BTreeSet<String> = form.fields.iter().map(|f| f.id.clone()).collect();
    let columns = form
        .columns
        .iter_mut()
        .chain(form.sections.iter_mut().flat_map(|s| s.columns.iter_mut()));
    for column in columns {
        let before = column.field_ids.len();
        column.field_ids.retain(|id| field_ids.contains(id));
        report.column_entries_removed += before - column.field_ids.len();
    }

    if !report.is_clean() {
        debug!(form = %form.id, removed = report.total(), "form pruned");
    }
    report
}

/// Non-fatal finding about a form definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaIssue {
    DuplicateSectionOrder { order: i64, sections: Vec<String> },
    DuplicateSectionId { id: String },
    DuplicateFieldId { id: String },
    DanglingSection { field: String, section: String },
    DanglingColumn { field: String, column: String },
    DanglingNextSection { section: String, target: String },
    StaleRuleAnswer { field: String, answer: String },
    DanglingRuleTarget { field: String, target: String },
    DuplicateRuleAnswer { field: String, answer: String },
    RulesOnNonDropdown { field: String },
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSectionOrder { order, sections } => write!(
                f,
                "sections {} share order {order}; list position breaks the tie",
                sections.join(", ")
            ),
            Self::DuplicateSectionId { id } => write!(f, "duplicate section id '{id}'"),
            Self::DuplicateFieldId { id } => write!(f, "duplicate field id '{id}'"),
            Self::DanglingSection { field, section } => {
                write!(f, "field '{field}' references missing section '{section}'")
            }
            Self::DanglingColumn { field, column } => {
                write!(f, "field '{field}' references missing column '{column}'")
            }
            Self::DanglingNextSection { section, target } => write!(
                f,
                "section '{section}' continues to missing section '{target}'"
            ),
            Self::StaleRuleAnswer { field, answer } => write!(
                f,
                "field '{field}' has a rule for '{answer}' which is not an option"
            ),
            Self::DanglingRuleTarget { field, target } => write!(
                f,
                "field '{field}' has a rule targeting missing section '{target}'"
            ),
            Self::DuplicateRuleAnswer { field, answer } => write!(
                f,
                "field '{field}' has several rules for '{answer}'; the first one wins"
            ),
            Self::RulesOnNonDropdown { field } => {
                write!(f, "field '{field}' has rules but is not a dropdown")
            }
        }
    }
}

/// Lists integrity findings without modifying the form.
pub fn check(form: &Form) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    let mut by_order: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    let mut seen_sections = BTreeSet::new();
    for section in &form.sections {
        by_order
            .entry(section.order)
            .or_default()
            .push(section.id.clone());
        if !seen_sections.insert(section.id.as_str()) {
            issues.push(SchemaIssue::DuplicateSectionId {
                id: section.id.clone(),
            });
        }
    }
    for (order, sections) in by_order {
        if sections.len() > 1 {
            issues.push(SchemaIssue::DuplicateSectionOrder { order, sections });
        }
    }

    for section in &form.sections {
        if let Some(SectionTarget::Section(target)) = &section.next_section_id
            && !form.has_section(target)
        {
            issues.push(SchemaIssue::DanglingNextSection {
                section: section.id.clone(),
                target: target.clone(),
            });
        }
    }

    let column_exists = |id: &str| {
        form.columns.iter().any(|c| c.id == id)
            || form
                .sections
                .iter()
                .any(|s| s.columns.iter().any(|c| c.id == id))
    };

    let mut seen_fields = BTreeSet::new();
    for field in &form.fields {
        if !seen_fields.insert(field.id.as_str()) {
            issues.push(SchemaIssue::DuplicateFieldId {
                id: field.id.clone(),
            });
        }
        if let Some(section) = &field.section_id
            && !form.has_section(section)
        {
            issues.push(SchemaIssue::DanglingSection {
                field: field.id.clone(),
                section: section.clone(),
            });
        }
        if let Some(column) = &field.column_id
            && !column_exists(column)
        {
            issues.push(SchemaIssue::DanglingColumn {
                field: field.id.clone(),
                column: column.clone(),
            });
        }
        check_rules(form, field, &mut issues);
    }

    issues
}

fn check_rules(form: &Form, field: &Field, issues: &mut Vec<SchemaIssue>) {
    let rules = field.rules();
    if rules.is_empty() {
        return;
    }
    if field.kind != FieldType::Dropdown {
        issues.push(SchemaIssue::RulesOnNonDropdown {
            field: field.id.clone(),
        });
        return;
    }

    let mut answers = BTreeSet::new();
    for rule in rules {
        if !field.has_option(&rule.answer) {
            issues.push(SchemaIssue::StaleRuleAnswer {
                field: field.id.clone(),
                answer: rule.answer.clone(),
            });
        }
        if !form.resolves(&rule.target_section_id) {
            issues.push(SchemaIssue::DanglingRuleTarget {
                field: field.id.clone(),
                target: rule.target_section_id.to_string(),
            });
        }
        if !answers.insert(rule.answer.as_str()) {
            issues.push(SchemaIssue::DuplicateRuleAnswer {
                field: field.id.clone(),
                answer: rule.answer.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Column, ConditionalRule, Field, Section};

    fn branching_form() -> Form {
        Form::new("f", "Branching")
            .with_section(Section::new("s1", "One", 1).with_next("gone"))
            .with_section(Section::new("s2", "Two", 2))
            .with_field(
                Field::dropdown("pick", "Pick", ["Yes", "No"])
                    .in_section("s1")
                    .with_rule(ConditionalRule::new("Yes", "s2"))
                    .with_rule(ConditionalRule::new("Maybe", "s2"))
                    .with_rule(ConditionalRule::new("No", "deleted"))
                    .with_rule(ConditionalRule::new("No", SectionTarget::End)),
            )
            .with_field(Field::text("orphan", "Orphan").in_section("deleted"))
    }

    #[test]
    fn prune_drops_stale_rules_and_dangling_refs() {
        let mut form = branching_form();
        let report = prune(&mut form);

        assert_eq!(report.rules_removed, 2);
        assert_eq!(report.section_refs_cleared, 1);
        assert_eq!(report.next_targets_cleared, 1);
        let pick = form.field("pick").unwrap();
        assert_eq!(
            pick.rules(),
            &[
                ConditionalRule::new("Yes", "s2"),
                ConditionalRule::new("No", SectionTarget::End)
            ]
        );
        assert_eq!(form.field("orphan").unwrap().section_id, None);
        assert_eq!(form.sections[0].next_section_id, None);
    }

    #[test]
    fn prune_removes_logic_when_nothing_survives() {
        let mut form = Form::new("f", "F")
            .with_section(Section::new("s1", "One", 1))
            .with_field(
                Field::dropdown("pick", "Pick", ["A"]).with_rule(ConditionalRule::new("B", "s1")),
            );
        prune(&mut form);
        assert!(form.field("pick").unwrap().conditional_logic.is_none());
        assert!(prune(&mut form).is_clean());
    }

    #[test]
    fn prune_cleans_column_entries() {
        let mut form = Form::new("f", "F").with_field(Field::text("a", "A"));
        let mut column = Column::new("c1", "Main");
        column.field_ids = vec!["a".into(), "missing".into()];
        form.columns.push(column);
        form.fields[0].column_id = Some("nope".into());

        let report = prune(&mut form);
        assert_eq!(report.column_entries_removed, 1);
        assert_eq!(report.column_refs_cleared, 1);
        assert_eq!(form.columns[0].field_ids, vec!["a".to_string()]);
    }

    #[test]
    fn check_reports_without_mutating() {
        let mut form = branching_form();
        form.sections.push(Section::new("s3", "Three", 2));
        let before = form.clone();
        let issues = check(&form);
        assert_eq!(form, before);

        assert!(issues.contains(&SchemaIssue::DuplicateSectionOrder {
            order: 2,
            sections: vec!["s2".into(), "s3".into()],
        }));
        assert!(issues.contains(&SchemaIssue::StaleRuleAnswer {
            field: "pick".into(),
            answer: "Maybe".into(),
        }));
        assert!(issues.contains(&SchemaIssue::DanglingRuleTarget {
            field: "pick".into(),
            target: "deleted".into(),
        }));
        assert!(issues.contains(&SchemaIssue::DuplicateRuleAnswer {
            field: "pick".into(),
            answer: "No".into(),
        }));
        assert!(issues.contains(&SchemaIssue::DanglingNextSection {
            section: "s1".into(),
            target: "gone".into(),
        }));
    }
}

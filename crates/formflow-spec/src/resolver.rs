use crate::prune::rule_is_live;
use crate::spec::{ConditionalRule, Field, Form, SectionTarget};

/// First rule whose `answer` equals `value`, in declaration order.
pub fn match_rule<'a>(rules: &'a [ConditionalRule], value: &str) -> Option<&'a ConditionalRule> {
    rules.iter().find(|rule| rule.answer == value)
}

/// Branch target for `value` on `field`, ignoring rules that went stale
/// (answer no longer an option, target section deleted).
pub fn resolve_branch<'a>(form: &Form, field: &'a Field, value: &str) -> Option<&'a SectionTarget> {
    field
        .rules()
        .iter()
        .filter(|rule| rule_is_live(form, field, &rule.answer, &rule.target_section_id))
        .find(|rule| rule.answer == value)
        .map(|rule| &rule.target_section_id)
}

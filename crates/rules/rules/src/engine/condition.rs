use std::collections::HashMap;

use paygate_core::Condition;

/// Match a page's attributes against a rule's condition map.
///
/// A rule with no conditions, or a page with no attributes, never matches.
/// Only keys present on both sides are evaluated; the rule matches as soon
/// as one of them passes. Condition keys the page does not carry are
/// ignored.
pub fn evaluate_conditions(
    conditions: Option<&HashMap<String, Condition>>,
    page_attributes: &HashMap<String, String>,
) -> bool {
    let Some(conditions) = conditions.filter(|c| !c.is_empty()) else {
        return false;
    };
    if page_attributes.is_empty() {
        return false;
    }

    conditions.iter().any(|(key, condition)| {
        page_attributes
            .get(key)
            .is_some_and(|value| condition.accepts(value))
    })
}

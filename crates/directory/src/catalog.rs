use std::collections::BTreeSet;

use crate::entity::Entity;

/// Upper bound on category picker suggestions.
pub const MAX_SUGGESTIONS: usize = 10;

/// Every distinct non-blank category (trimmed), in ascending order.
pub fn category_catalog(entities: &[Entity]) -> Vec<String> {
    entities
        .iter()
        .filter_map(Entity::trimmed_category)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Every distinct department tag, in ascending order.
pub fn department_catalog(entities: &[Entity]) -> Vec<String> {
    entities
        .iter()
        .flat_map(|e| e.departments.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Category picker suggestions for a typed `term`.
///
/// Case-insensitive substring match against the catalog, skipping values that
/// are already selected, capped at [`MAX_SUGGESTIONS`]. A blank term suggests
/// nothing.
pub fn suggest_categories<'a>(
    catalog: &'a [String],
    term: &str,
    selected: &BTreeSet<String>,
) -> Vec<&'a str> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|c| !selected.contains(*c))
        .filter(|c| c.to_lowercase().contains(&term))
        .take(MAX_SUGGESTIONS)
        .map(String::as_str)
        .collect()
}

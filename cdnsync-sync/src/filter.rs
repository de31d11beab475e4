//! Name filtering over literal, pattern, and predicate filters.

use cdnsync_core::{Asset, Filter};

/// Whether a single filter matches `name`.
pub fn matches(filter: &Filter, name: &str) -> bool {
    match filter {
        Filter::Literal(literal) => literal == name,
        Filter::Pattern(re) => re.is_match(name),
        Filter::Predicate(f) => f(name),
    }
}

/// Whether `name` survives `filters`.
///
/// Any match counts (OR semantics). With `keep_on_match` the name is kept
/// when it matches; otherwise it is dropped when it matches. An empty filter
/// set always passes.
pub fn passes(name: &str, filters: &[Filter], keep_on_match: bool) -> bool {
    if filters.is_empty() {
        return true;
    }
    let hit = filters.iter().any(|f| matches(f, name));
    hit == keep_on_match
}

/// Apply the include pass, then the exclude pass, preserving order.
pub fn select(assets: Vec<Asset>, include: &[Filter], exclude: &[Filter]) -> Vec<Asset> {
    assets
        .into_iter()
        .filter(|a| passes(&a.name, include, true))
        .filter(|a| passes(&a.name, exclude, false))
        .collect()
}

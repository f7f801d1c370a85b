//! INFO reply parsing.

use std::collections::BTreeMap;

/// Flatten an INFO reply into `field -> value` pairs.
///
/// Section headers (`# Server`) and blank lines are dropped; values are kept
/// verbatim. Later duplicates win.
pub fn parse_info(reply: &str) -> BTreeMap<String, String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

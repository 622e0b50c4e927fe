//! Naming utilities for catalog_sync
//!
//! Identifier quoting, case folding and the old-name/name selection used by
//! identity matching.

/// Quote an identifier with backticks, doubling embedded backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal with single quotes
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Build `schema`.`name`, or just `name` when schemas are omitted
pub fn qualified_name(schema: &str, name: &str, omit_schema: bool) -> String {
    if omit_schema || schema.is_empty() {
        quote_identifier(name)
    } else {
        format!("{}.{}", quote_identifier(schema), quote_identifier(name))
    }
}

/// Upper-case a name unless comparisons are case sensitive
pub fn fold_case(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_uppercase()
    }
}

/// Compare two names honoring case sensitivity
pub fn same_name(left: &str, right: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        left == right
    } else {
        left.eq_ignore_ascii_case(right) || left.to_uppercase() == right.to_uppercase()
    }
}

/// The name an object had on the other side, falling back to its current name
pub fn old_name_or_name<'a>(name: &'a str, old_name: &'a str) -> &'a str {
    if old_name.is_empty() {
        name
    } else {
        old_name
    }
}

/// Truncate to at most `max` characters; zero means unlimited
pub fn truncate_chars(value: &str, max: usize) -> &str {
    if max == 0 {
        return value;
    }
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

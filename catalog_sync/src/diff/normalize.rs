//! Normalization rules installed into an [`Omf`]
//!
//! Reverse-engineered catalogs and hand-written models spell many things
//! differently (case, defaults, whitespace). The rules here make such
//! cosmetic differences compare equal.

use crate::catalog::datatype::is_numeric_type;
use crate::catalog::members::Value;
use crate::catalog::types::{Catalog, Column, ObjectId, ObjectKind};
use crate::catalog::keys::qualified_key;
use crate::config::ComparisonConfig;
use crate::diff::omf::{CompareContext, Omf};
use crate::utils::naming::truncate_chars;

const DEFAULT_DEFINER: &str = "ROOT@LOCALHOST";

/// Builds the normalization rule set for one diff pass
#[derive(Debug, Clone)]
pub struct NormalizedComparer {
    pub case_sensitive: bool,
    pub skip_routine_definer: bool,
    pub max_table_comment_length: usize,
    pub max_index_comment_length: usize,
    pub max_column_comment_length: usize,
}

impl Default for NormalizedComparer {
    fn default() -> Self {
        Self::from_config(&ComparisonConfig::default())
    }
}

impl NormalizedComparer {
    pub fn from_config(config: &ComparisonConfig) -> Self {
        Self {
            case_sensitive: config.case_sensitive,
            skip_routine_definer: config.skip_routine_definer,
            max_table_comment_length: config.max_table_comment_length,
            max_index_comment_length: config.max_index_comment_length,
            max_column_comment_length: config.max_column_comment_length,
        }
    }

    /// Reset the overrides of `omf` and install the normalization rules
    ///
    /// Must run before every independent diff pass.
    pub fn init_omf(&self, omf: &mut Omf) {
        omf.clear_overrides();
        omf.case_sensitive = self.case_sensitive;
        omf.skip_routine_definer = self.skip_routine_definer;

        omf.add_override("owner", |_, _, _| true);

        omf.add_override("name", name_compare);
        omf.add_override("oldName", name_compare);
        omf.add_override("referencedTable", referenced_table_compare);

        omf.add_override("rowFormat", |_, l, r| caseless_with_default(l, r, &["DEFAULT"]));
        omf.add_override("packKeys", |_, l, r| caseless_with_default(l, r, &["DEFAULT"]));
        omf.add_override("tableEngine", |_, l, r| caseless_with_default(l, r, &[]));
        omf.add_override("deleteRule", |_, l, r| caseless_with_default(l, r, &["RESTRICT", "NO ACTION"]));
        omf.add_override("updateRule", |_, l, r| caseless_with_default(l, r, &["RESTRICT", "NO ACTION"]));
        omf.add_override("mergeUnion", |_, l, r| table_list(l) == table_list(r));

        let limits = self.clone();
        omf.add_override("comment", move |ctx, l, r| limits.comment_compare(ctx, l, r));

        for attr in [
            "characterSetName",
            "collationName",
            "defaultCharacterSetName",
            "defaultCollationName",
        ] {
            omf.add_override(attr, charset_collation_compare);
        }

        omf.add_override("datatypeExplicitParams", explicit_params_compare);
        omf.add_override("sqlDefinition", sql_definition_compare);
        omf.add_override("definer", definer_compare);
        omf.add_override("length", unset_int_compare);
        omf.add_override("precision", unset_int_compare);
        omf.add_override("scale", unset_int_compare);
        omf.add_override("defaultValue", default_value_compare);
        omf.add_override("autoIncrement", autoincrement_compare);
        omf.add_override("flags", flags_compare);
    }

    fn comment_compare(&self, ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
        let max = match ctx.kind {
            ObjectKind::Schema => return true,
            ObjectKind::Table => self.max_table_comment_length,
            ObjectKind::Index => self.max_index_comment_length,
            ObjectKind::Column => self.max_column_comment_length,
            _ => 0,
        };
        match (left.as_str(), right.as_str()) {
            (Some(l), Some(r)) => truncate_chars(l, max) == truncate_chars(r, max),
            _ => false,
        }
    }
}

fn strings<'v>(left: &'v Value, right: &'v Value) -> Option<(&'v str, &'v str)> {
    Some((left.as_str()?, right.as_str()?))
}

fn name_compare(ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    // Column names are caseless on every server
    if ctx.omf.case_sensitive && ctx.kind != ObjectKind::Column {
        return false;
    }
    strings(left, right).map_or(false, |(l, r)| l.to_uppercase() == r.to_uppercase())
}

fn referenced_table_compare(ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Ref(Some(l)), Value::Ref(Some(r))) => {
            qualified_key(ctx.source, l, false) == qualified_key(ctx.target, r, false)
        }
        (Value::Ref(None), Value::Ref(None)) => true,
        _ => false,
    }
}

/// Caseless comparison where any of `defaults` equals the empty string
fn caseless_with_default(left: &Value, right: &Value, defaults: &[&str]) -> bool {
    let normalize = |s: &str| {
        let upper = s.trim().to_uppercase();
        if defaults.contains(&upper.as_str()) {
            String::new()
        } else {
            upper
        }
    };
    strings(left, right).map_or(false, |(l, r)| normalize(l) == normalize(r))
}

fn table_list(value: &Value) -> Vec<String> {
    value
        .as_str()
        .unwrap_or_default()
        .split(',')
        .map(|t| t.trim().replace('`', "").to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Charset/collation declared by the owner of an object
fn inherited_default(catalog: &Catalog, id: &ObjectId, collation: bool) -> String {
    let mut current = catalog.owner_of(id);
    while let Some(owner) = current {
        let value = if let Some(table) = catalog.tables.get(&owner) {
            if collation { &table.default_collation } else { &table.default_charset }
        } else if let Some(schema) = catalog.schemas.get(&owner) {
            if collation { &schema.default_collation } else { &schema.default_charset }
        } else if owner == catalog.id {
            if collation { &catalog.default_collation } else { &catalog.default_charset }
        } else {
            return String::new();
        };
        if !value.is_empty() {
            return value.clone();
        }
        current = catalog.owner_of(&owner);
    }
    String::new()
}

fn effective_charset_value(catalog: &Catalog, id: &ObjectId, attr: &str, value: &str) -> String {
    let collation = attr.to_lowercase().contains("collation");
    let mut value = value.to_lowercase();
    if let Some(column) = catalog.columns.get(id) {
        if value.is_empty() && !collation && column.has_flag("ASCII") {
            value = "latin1".to_string();
        }
        if value.is_empty() && collation && column.has_flag("BINARY") {
            let charset = if column.charset.is_empty() {
                inherited_default(catalog, id, false)
            } else {
                column.charset.clone()
            };
            if !charset.is_empty() {
                value = format!("{}_bin", charset.to_lowercase());
            }
        }
    }
    if value.is_empty() {
        value = inherited_default(catalog, id, collation).to_lowercase();
    }
    value
}

fn charset_collation_compare(ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    let (l, r) = match strings(left, right) {
        Some(pair) => pair,
        None => return false,
    };
    let l = effective_charset_value(ctx.source, ctx.source_id, ctx.attr, l);
    let r = effective_charset_value(ctx.target, ctx.target_id, ctx.attr, r);
    if l.is_empty() || r.is_empty() || l == r {
        return true;
    }
    // A BINARY flag stands for the `_bin` collation of whatever charset is in effect
    if ctx.attr == "collationName" {
        let binary = |catalog: &Catalog, id: &ObjectId| catalog.columns.get(id).map_or(false, |c| c.has_flag("BINARY"));
        return (binary(ctx.source, ctx.source_id) && r.ends_with("_bin"))
            || (binary(ctx.target, ctx.target_id) && l.ends_with("_bin"));
    }
    false
}

/// Split an ENUM/SET parameter list on commas outside quotes
fn split_params(text: &str) -> Vec<String> {
    let inner = text
        .trim()
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in inner.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == ',' => out.push(std::mem::take(&mut current).trim().to_string()),
            None => current.push(ch),
        }
    }
    if !current.trim().is_empty() || !out.is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

fn explicit_params_compare(ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    let both_enum_or_set = match (ctx.source.columns.get(ctx.source_id), ctx.target.columns.get(ctx.target_id)) {
        (Some(a), Some(b)) => a.simple_type == b.simple_type && (a.simple_type == "ENUM" || a.simple_type == "SET"),
        _ => false,
    };
    if !both_enum_or_set {
        return false;
    }
    match strings(left, right) {
        Some((l, r)) if !l.is_empty() && !r.is_empty() => split_params(l) == split_params(r),
        _ => false,
    }
}

/// Collapse whitespace and upper-case everything outside quotes
pub fn normalize_sql(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    for ch in text.trim().trim_end_matches(';').trim_end().chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None if ch.is_whitespace() => pending_space = true,
            None => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                if ch == '\'' || ch == '"' || ch == '`' {
                    quote = Some(ch);
                }
                out.extend(ch.to_uppercase());
            }
        }
    }
    out
}

fn sql_definition_compare(ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    let (l, r) = match strings(left, right) {
        Some(pair) => pair,
        None => return false,
    };
    if ctx.kind == ObjectKind::View {
        let (a, b) = match (ctx.source.views.get(ctx.source_id), ctx.target.views.get(ctx.target_id)) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        // The server rewrites view code; compare against the stored snapshots when present
        let (model, server) = if !b.old_model_sql_definition.is_empty() && a.old_model_sql_definition.is_empty() {
            (b, a)
        } else {
            (a, b)
        };
        if !model.old_model_sql_definition.is_empty() || !model.old_server_sql_definition.is_empty() {
            return model.sql_definition == model.old_model_sql_definition
                && model.old_server_sql_definition == server.sql_definition;
        }
    }
    normalize_sql(l) == normalize_sql(r)
}

fn normalize_definer(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| *c != '`' && *c != '\'' && *c != '"')
        .collect::<String>()
        .trim()
        .to_uppercase();
    if stripped.is_empty() {
        DEFAULT_DEFINER.to_string()
    } else {
        stripped
    }
}

fn definer_compare(ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    if ctx.omf.skip_routine_definer && matches!(ctx.kind, ObjectKind::Routine | ObjectKind::Trigger) {
        return true;
    }
    strings(left, right).map_or(false, |(l, r)| normalize_definer(l) == normalize_definer(r))
}

fn unset_int_compare(_: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    left.as_int() == Some(-1) || right.as_int() == Some(-1)
}

fn trim_zeros(value: &str) -> String {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return value.to_string();
    }
    let trimmed = value.trim_start_matches('0');
    if trimmed.is_empty() || (trimmed.starts_with('.') && trimmed[1..].chars().all(|c| c == '0')) {
        return "0".to_string();
    }
    if trimmed.starts_with('.') {
        return format!("0{}", trimmed);
    }
    trimmed.to_string()
}

/// Canonical spelling of a column default value
pub fn normalize_default(value: &str) -> String {
    let mut value = value.trim();
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            value = &value[1..value.len() - 1];
        }
    }
    match value.to_uppercase().as_str() {
        "" | "NULL" | "0000-00-00 00:00:00" => String::new(),
        "NOW()" | "CURRENT_TIMESTAMP()" | "LOCALTIME" | "LOCALTIME()" | "LOCALTIMESTAMP" | "LOCALTIMESTAMP()" => {
            "CURRENT_TIMESTAMP".to_string()
        }
        "TRUE" => "1".to_string(),
        "FALSE" => "0".to_string(),
        _ => trim_zeros(value),
    }
}

fn default_value_compare(_: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    strings(left, right).map_or(false, |(l, r)| normalize_default(l) == normalize_default(r))
}

fn autoincrement_compare(ctx: &CompareContext<'_>, _: &Value, _: &Value) -> bool {
    let numeric = |column: Option<&Column>| column.map_or(false, |c| is_numeric_type(&c.simple_type));
    !numeric(ctx.source.columns.get(ctx.source_id)) || !numeric(ctx.target.columns.get(ctx.target_id))
}

fn normalized_flags(value: &Value) -> Option<Vec<String>> {
    let mut flags: Vec<String> = match value {
        Value::StrList(items) => items.iter().map(|f| f.to_uppercase()).collect(),
        _ => return None,
    };
    if flags.iter().any(|f| f == "ZEROFILL") && !flags.iter().any(|f| f == "UNSIGNED") {
        flags.push("UNSIGNED".to_string());
    }
    // Charset comparison handles these
    flags.retain(|f| f != "ASCII" && f != "BINARY");
    flags.sort();
    flags.dedup();
    Some(flags)
}

fn flags_compare(_: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
    match (normalized_flags(left), normalized_flags(right)) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("'0000-00-00 00:00:00'", "")]
    #[case("NOW()", "CURRENT_TIMESTAMP")]
    #[case("localtimestamp", "CURRENT_TIMESTAMP")]
    #[case("TRUE", "1")]
    #[case("'007'", "7")]
    #[case("000", "0")]
    #[case("NULL", "")]
    #[case("'abc'", "abc")]
    fn test_normalize_default(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_default(input), expected);
    }

    #[test]
    fn test_split_params_ignores_spacing() {
        assert_eq!(split_params("('a','b')"), split_params("('a', 'b')"));
        assert_eq!(split_params("('a,b', 'c')"), vec!["'a,b'".to_string(), "'c'".to_string()]);
    }

    #[test]
    fn test_normalize_sql_keeps_quoted_text() {
        assert_eq!(
            normalize_sql("set  new.a =\n 'Mixed  Case';"),
            "SET NEW.A = 'Mixed  Case'"
        );
    }
}

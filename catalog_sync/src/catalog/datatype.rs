//! Column datatype parsing and formatting

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::types::Column;

static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*([a-z]+(?:\s+precision|\s+varying)?)\s*(?:\((.*)\))?\s*(.*?)\s*$")
        .expect("datatype pattern compiles")
});

/// The pieces a textual type is split into
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedType {
    pub simple_type: String,
    pub length: i64,
    pub precision: i64,
    pub scale: i64,
    pub explicit_params: String,
    pub flags: Vec<String>,
}

const INTEGER_TYPES: &[&str] = &["TINYINT", "SMALLINT", "MEDIUMINT", "INT", "BIGINT"];
const DECIMAL_TYPES: &[&str] = &["DECIMAL", "NUMERIC", "FLOAT", "DOUBLE", "REAL", "DOUBLE PRECISION"];
const LENGTH_TYPES: &[&str] = &[
    "CHAR", "VARCHAR", "BINARY", "VARBINARY", "BIT", "TEXT", "BLOB", "TIME", "DATETIME", "TIMESTAMP", "YEAR",
];
const STRING_TYPES: &[&str] = &[
    "CHAR", "VARCHAR", "TINYTEXT", "TEXT", "MEDIUMTEXT", "LONGTEXT", "ENUM", "SET",
];

/// Canonical spelling of a simple type name
pub fn canonical_type(name: &str) -> String {
    let upper = name.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    match upper.as_str() {
        "INTEGER" => "INT".to_string(),
        "DEC" | "FIXED" => "DECIMAL".to_string(),
        "BOOL" | "BOOLEAN" => "TINYINT".to_string(),
        "CHARACTER VARYING" | "CHAR VARYING" => "VARCHAR".to_string(),
        _ => upper,
    }
}

/// Parse a textual type such as `DECIMAL(10,2) UNSIGNED` or `ENUM('a', 'b')`
pub fn parse_type(text: &str) -> ParsedType {
    let mut parsed = ParsedType {
        simple_type: text.trim().to_uppercase(),
        length: -1,
        precision: -1,
        scale: -1,
        explicit_params: String::new(),
        flags: Vec::new(),
    };

    let captures = match TYPE_RE.captures(text) {
        Some(c) => c,
        None => return parsed,
    };

    let raw_name = captures.get(1).map_or("", |m| m.as_str());
    parsed.simple_type = canonical_type(raw_name);
    if matches!(raw_name.trim().to_uppercase().as_str(), "BOOL" | "BOOLEAN") {
        parsed.precision = 1;
    }

    if let Some(params) = captures.get(2).map(|m| m.as_str().trim()) {
        let simple = parsed.simple_type.as_str();
        if simple == "ENUM" || simple == "SET" {
            parsed.explicit_params = format!("({})", params);
        } else {
            let numbers: Vec<i64> = params
                .split(',')
                .filter_map(|p| p.trim().parse::<i64>().ok())
                .collect();
            if LENGTH_TYPES.contains(&simple) {
                parsed.length = numbers.first().copied().unwrap_or(-1);
            } else {
                parsed.precision = numbers.first().copied().unwrap_or(-1);
                parsed.scale = numbers.get(1).copied().unwrap_or(-1);
            }
        }
    }

    if let Some(rest) = captures.get(3) {
        parsed.flags = rest
            .as_str()
            .split_whitespace()
            .map(|f| f.to_uppercase())
            .collect();
    }

    parsed
}

/// Render the column's type back into text
pub fn format_type(column: &Column) -> String {
    let mut out = column.simple_type.clone();
    if !column.explicit_params.is_empty() {
        out.push_str(&column.explicit_params);
    } else if column.length >= 0 {
        out.push_str(&format!("({})", column.length));
    } else if column.precision >= 0 {
        if column.scale >= 0 {
            out.push_str(&format!("({},{})", column.precision, column.scale));
        } else {
            out.push_str(&format!("({})", column.precision));
        }
    }
    for flag in &column.flags {
        out.push(' ');
        out.push_str(flag);
    }
    out
}

/// Whether values of this type are numbers
pub fn is_numeric_type(simple_type: &str) -> bool {
    let simple = canonical_type(simple_type);
    INTEGER_TYPES.contains(&simple.as_str()) || DECIMAL_TYPES.contains(&simple.as_str()) || simple == "BIT"
}

/// Whether the type carries a character set
pub fn is_string_type(simple_type: &str) -> bool {
    STRING_TYPES.contains(&canonical_type(simple_type).as_str())
}

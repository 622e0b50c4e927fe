//! Option bag for the SQL generator
//!
//! Keys follow the names scripting front-ends already pass around
//! (`UseFilteredLists`, `SQL_MODE`, ...). Unknown keys are ignored and missing
//! keys take their defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::types::ObjectKind;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::utils::naming::fold_case;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GeneratorOptions {
    pub use_filtered_lists: bool,
    pub schema_filter_list: Vec<String>,
    pub table_filter_list: Vec<String>,
    pub view_filter_list: Vec<String>,
    pub routine_filter_list: Vec<String>,
    pub trigger_filter_list: Vec<String>,
    pub case_sensitive: bool,
    pub keep_order: bool,
    #[serde(rename = "SQL_MODE")]
    pub sql_mode: String,
    pub generate_schema_drops: bool,
    pub omit_schemas: bool,
    pub generate_use: bool,
    pub separate_foreign_keys: bool,
    pub skip_foreign_keys: bool,
    #[serde(rename = "SkipFKIndexes")]
    pub skip_fk_indexes: bool,
    pub sql_delimiter: String,
    pub generate_document_properties: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            use_filtered_lists: true,
            schema_filter_list: Vec::new(),
            table_filter_list: Vec::new(),
            view_filter_list: Vec::new(),
            routine_filter_list: Vec::new(),
            trigger_filter_list: Vec::new(),
            case_sensitive: false,
            keep_order: false,
            sql_mode: String::new(),
            generate_schema_drops: false,
            omit_schemas: false,
            generate_use: false,
            separate_foreign_keys: true,
            skip_foreign_keys: false,
            skip_fk_indexes: false,
            sql_delimiter: "$$".to_string(),
            generate_document_properties: false,
        }
    }
}

impl GeneratorOptions {
    /// Options that generate SQL for every object regardless of filter lists
    pub fn all_objects() -> Self {
        Self {
            use_filtered_lists: false,
            ..Default::default()
        }
    }

    /// Seed the bag from the `[generator]` configuration section
    pub fn from_config(config: &GeneratorConfig, case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            keep_order: config.keep_order,
            sql_mode: config.sql_mode.clone(),
            generate_schema_drops: config.generate_schema_drops,
            omit_schemas: config.omit_schemas,
            generate_use: config.generate_use,
            separate_foreign_keys: config.separate_foreign_keys,
            sql_delimiter: config.sql_delimiter.clone(),
            generate_document_properties: config.generate_document_properties,
            ..Default::default()
        }
    }

    /// Parse a JSON object of options
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Filter list holding keys of the given kind, if the kind is filterable
    pub fn filter_list(&self, kind: ObjectKind) -> Option<&[String]> {
        match kind {
            ObjectKind::Schema => Some(&self.schema_filter_list),
            ObjectKind::Table => Some(&self.table_filter_list),
            ObjectKind::View => Some(&self.view_filter_list),
            ObjectKind::Routine => Some(&self.routine_filter_list),
            ObjectKind::Trigger => Some(&self.trigger_filter_list),
            _ => None,
        }
    }

    /// Filter list of a kind folded for lookups
    pub(crate) fn folded_filter(&self, kind: ObjectKind) -> HashSet<String> {
        self.filter_list(kind)
            .map(|list| list.iter().map(|k| fold_case(k, self.case_sensitive)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_options_from_json_ignores_unknown_keys() {
        let options = GeneratorOptions::from_json(
            r#"{"UseFilteredLists": false, "SQL_MODE": "TRADITIONAL", "SkipFKIndexes": true,
                "TableFilterList": ["table::`s`.`t`"], "Whatever": 12}"#,
        )
        .unwrap();
        assert!(!options.use_filtered_lists);
        assert!(options.skip_fk_indexes);
        assert!(options.separate_foreign_keys);
        assert_eq!(options.sql_mode, "TRADITIONAL");
        assert_eq!(options.sql_delimiter, "$$");
        assert_eq!(options.table_filter_list, vec!["table::`s`.`t`".to_string()]);
    }

    #[test]
    fn test_from_config_copies_generator_defaults() {
        let config = GeneratorConfig::default();
        let options = GeneratorOptions::from_config(&config, true);
        assert!(options.keep_order);
        assert!(options.case_sensitive);
        assert!(options.use_filtered_lists);
        assert_eq!(options.sql_mode, config.sql_mode);
    }
}

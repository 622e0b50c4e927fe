//! Configuration handling for catalog_sync

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// SQL mode the generated scripts run under unless configured otherwise
pub const DEFAULT_SQL_MODE: &str = "ONLY_FULL_GROUP_BY,STRICT_TRANS_TABLES,NO_ZERO_IN_DATE,NO_ZERO_DATE,ERROR_FOR_DIVISION_BY_ZERO,NO_ENGINE_SUBSTITUTION";

/// Represents the complete catalog_sync configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub comparison: ComparisonConfig,
    pub generator: GeneratorConfig,
    pub sync: SyncConfig,
    pub logging: Option<LoggingConfig>,
}

/// Settings that drive object matching and normalization
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ComparisonConfig {
    pub case_sensitive: bool,
    pub skip_routine_definer: bool,
    pub dontdiff_mask: u32,
    pub max_table_comment_length: usize,
    pub max_index_comment_length: usize,
    pub max_column_comment_length: usize,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            skip_routine_definer: false,
            dontdiff_mask: 3,
            max_table_comment_length: 60,
            max_index_comment_length: 0,
            max_column_comment_length: 255,
        }
    }
}

/// Defaults for the SQL generator option bag
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    pub keep_order: bool,
    pub omit_schemas: bool,
    pub generate_use: bool,
    pub generate_schema_drops: bool,
    pub separate_foreign_keys: bool,
    pub sql_mode: String,
    pub sql_delimiter: String,
    pub generate_document_properties: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            keep_order: true,
            omit_schemas: false,
            generate_use: false,
            generate_schema_drops: false,
            separate_foreign_keys: true,
            sql_mode: DEFAULT_SQL_MODE.to_string(),
            sql_delimiter: "$$".to_string(),
            generate_document_properties: false,
        }
    }
}

/// Synchronization session behaviour
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub skip_triggers: bool,
    pub skip_routines: bool,
    pub schema_skip_list: Vec<String>,
    pub default_engine: String,
    pub profile_name: Option<String>,
    pub profile_file: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            skip_triggers: false,
            skip_routines: false,
            schema_skip_list: Vec::new(),
            default_engine: "InnoDB".to_string(),
            profile_name: None,
            profile_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub console: bool,
}

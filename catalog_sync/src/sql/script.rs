//! Synchronization script composition

use chrono::Utc;
use tracing::debug;

use crate::catalog::types::ObjectKind;
use crate::config::DEFAULT_SQL_MODE;
use crate::error::{Error, Result};
use crate::sql::generator::SqlOutput;
use crate::sql::options::GeneratorOptions;
use crate::utils::naming::{quote_identifier, quote_string};

/// Compose `output.statements` into an executable script stored in `output.script`
///
/// Plain DDL comes first, then views (each preceded by a `USE`), then
/// routines and triggers inside one `DELIMITER` block. Server variables that
/// would make the statements fail midway are saved before and restored after.
pub fn make_sql_sync_script(options: &GeneratorOptions, output: &mut SqlOutput) -> Result<()> {
    if output.statements.len() != output.objects.len() || output.statements.len() != output.schemas.len() {
        return Err(Error::ScriptGeneration(format!(
            "{} statements for {} objects and {} schemas",
            output.statements.len(),
            output.objects.len(),
            output.schemas.len()
        )));
    }
    if output.statements.is_empty() {
        output.script.clear();
        return Ok(());
    }

    let delimiter = if options.sql_delimiter.is_empty() { "$$" } else { options.sql_delimiter.as_str() };
    let sql_mode = if options.sql_mode.is_empty() { DEFAULT_SQL_MODE } else { options.sql_mode.as_str() };

    let mut plain = String::new();
    let mut views = String::new();
    let mut blocks = String::new();
    let mut current_schema: Option<&str> = None;

    for ((sql, object), schema) in output.statements.iter().zip(&output.objects).zip(&output.schemas) {
        match object.kind {
            ObjectKind::View => {
                views.push_str(&format!("USE {};\n{};\n\n", quote_identifier(schema), sql));
            }
            ObjectKind::Routine | ObjectKind::Trigger => {
                blocks.push_str(&format!("USE {}{}\n{}{}\n\n", quote_identifier(schema), delimiter, sql, delimiter));
            }
            _ => {
                if options.generate_use && !schema.is_empty() && current_schema != Some(schema.as_str()) {
                    plain.push_str(&format!("USE {};\n\n", quote_identifier(schema)));
                    current_schema = Some(schema.as_str());
                }
                plain.push_str(&format!("{};\n\n", sql));
            }
        }
    }

    let mut script = String::from("-- catalog_sync synchronization script\n");
    if options.generate_document_properties {
        script.push_str(&format!("-- Generated: {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")));
    }
    script.push('\n');
    script.push_str("SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0;\n");
    script.push_str("SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0;\n");
    script.push_str(&format!("SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE={};\n\n", quote_string(sql_mode)));
    script.push_str(&plain);
    script.push_str(&views);
    if !blocks.is_empty() {
        script.push_str(&format!("DELIMITER {}\n\n", delimiter));
        script.push_str(&blocks);
        script.push_str("DELIMITER ;\n\n");
    }
    script.push_str("SET SQL_MODE=@OLD_SQL_MODE;\n");
    script.push_str("SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;\n");
    script.push_str("SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS;\n");

    debug!(bytes = script.len(), "Composed synchronization script");
    output.script = script;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{ObjectId, ObjectRef};
    use pretty_assertions::assert_eq;

    fn output(entries: &[(&str, ObjectKind, &str)]) -> SqlOutput {
        let mut output = SqlOutput::default();
        for (sql, kind, schema) in entries {
            output.statements.push(sql.to_string());
            output.objects.push(ObjectRef::new(*kind, ObjectId::new(), "x"));
            output.schemas.push(schema.to_string());
        }
        output
    }

    #[test]
    fn test_empty_statements_compose_to_empty_script() {
        let mut out = SqlOutput::default();
        out.script = "stale".to_string();
        make_sql_sync_script(&GeneratorOptions::default(), &mut out).unwrap();
        assert_eq!(out.script, "");
    }

    #[test]
    fn test_misaligned_lists_are_rejected() {
        let mut out = output(&[("DROP TABLE `s`.`t`", ObjectKind::Table, "s")]);
        out.objects.clear();
        let err = make_sql_sync_script(&GeneratorOptions::default(), &mut out).unwrap_err();
        assert!(matches!(err, Error::ScriptGeneration(_)));
    }

    #[test]
    fn test_script_sections() {
        let mut out = output(&[
            ("CREATE OR REPLACE VIEW `s`.`v` AS SELECT 1", ObjectKind::View, "s"),
            ("CREATE TRIGGER `s`.`trg` BEFORE INSERT ON `s`.`t` FOR EACH ROW SET @a = 1", ObjectKind::Trigger, "s"),
            ("DROP TABLE IF EXISTS `s`.`t`", ObjectKind::Table, "s"),
        ]);
        let options = GeneratorOptions {
            sql_mode: "TRADITIONAL".to_string(),
            ..Default::default()
        };
        make_sql_sync_script(&options, &mut out).unwrap();

        let expected = "-- catalog_sync synchronization script\n\
\n\
SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0;\n\
SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0;\n\
SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='TRADITIONAL';\n\
\n\
DROP TABLE IF EXISTS `s`.`t`;\n\
\n\
USE `s`;\n\
CREATE OR REPLACE VIEW `s`.`v` AS SELECT 1;\n\
\n\
DELIMITER $$\n\
\n\
USE `s`$$\n\
CREATE TRIGGER `s`.`trg` BEFORE INSERT ON `s`.`t` FOR EACH ROW SET @a = 1$$\n\
\n\
DELIMITER ;\n\
\n\
SET SQL_MODE=@OLD_SQL_MODE;\n\
SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;\n\
SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS;\n";
        assert_eq!(out.script, expected);
    }
}

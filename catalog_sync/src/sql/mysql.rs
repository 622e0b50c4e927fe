//! MySQL statement text
//!
//! Builds the DDL fragments the generator sequences: object definitions,
//! create/drop statements and table option clauses.

use crate::catalog::types::{Catalog, ObjectId, Table};
use crate::sql::partition::partition_by_clause;
use crate::utils::naming::{qualified_name, quote_identifier, quote_string};

/// Table option members and the clause keyword each maps to
pub const TABLE_OPTIONS: &[(&str, &str)] = &[
    ("tableEngine", "ENGINE"),
    ("defaultCharacterSetName", "DEFAULT CHARACTER SET"),
    ("defaultCollationName", "COLLATE"),
    ("comment", "COMMENT"),
    ("rowFormat", "ROW_FORMAT"),
    ("packKeys", "PACK_KEYS"),
    ("keyBlockSize", "KEY_BLOCK_SIZE"),
    ("minRows", "MIN_ROWS"),
    ("maxRows", "MAX_ROWS"),
    ("avgRowLength", "AVG_ROW_LENGTH"),
    ("nextAutoInc", "AUTO_INCREMENT"),
    ("checksum", "CHECKSUM"),
    ("delayKeyWrite", "DELAY_KEY_WRITE"),
    ("password", "PASSWORD"),
    ("mergeUnion", "UNION"),
    ("mergeInsert", "INSERT_METHOD"),
    ("connectionString", "CONNECTION"),
];

/// Renders MySQL DDL for objects of one catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect {
    pub omit_schemas: bool,
}

impl MysqlDialect {
    pub fn new(omit_schemas: bool) -> Self {
        Self { omit_schemas }
    }

    fn schema_name(&self, catalog: &Catalog, id: &ObjectId) -> String {
        catalog.schema_of(id).map(|s| s.name.clone()).unwrap_or_default()
    }

    /// `schema`.`object` for any schema-level object
    pub fn object_name(&self, catalog: &Catalog, id: &ObjectId) -> String {
        qualified_name(&self.schema_name(catalog, id), &catalog.name_of(id), self.omit_schemas)
    }

    /// `schema`.`table` under an explicit table name
    pub fn table_name_as(&self, catalog: &Catalog, id: &ObjectId, name: &str) -> String {
        qualified_name(&self.schema_name(catalog, id), name, self.omit_schemas)
    }

    pub fn column_definition(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let column = match catalog.columns.get(id) {
            Some(c) => c,
            None => return String::new(),
        };
        let mut out = format!("{} {}", quote_identifier(&column.name), column.formatted_type());
        if !column.charset.is_empty() {
            out.push_str(&format!(" CHARACTER SET {}", column.charset));
        }
        if !column.collation.is_empty() {
            out.push_str(&format!(" COLLATE {}", column.collation));
        }
        if column.not_null {
            out.push_str(" NOT NULL");
        }
        if column.auto_increment {
            out.push_str(" AUTO_INCREMENT");
        }
        if column.default_value_is_null {
            if !column.not_null {
                out.push_str(" DEFAULT NULL");
            }
        } else if !column.default_value.is_empty() {
            out.push_str(&format!(" DEFAULT {}", column.default_value));
        }
        if !column.comment.is_empty() {
            out.push_str(&format!(" COMMENT {}", quote_string(&column.comment)));
        }
        out
    }

    fn index_columns(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let index = match catalog.indices.get(id) {
            Some(i) => i,
            None => return String::new(),
        };
        index
            .columns
            .iter()
            .filter_map(|ic| catalog.index_columns.get(ic))
            .map(|ic| {
                let name = ic
                    .column
                    .as_ref()
                    .map(|c| catalog.name_of(c))
                    .unwrap_or_default();
                let mut part = quote_identifier(&name);
                if ic.column_length > 0 {
                    part.push_str(&format!("({})", ic.column_length));
                }
                if ic.descend {
                    part.push_str(" DESC");
                }
                part
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Index definition as used inside CREATE TABLE and after ALTER TABLE ... ADD
    pub fn index_definition(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let index = match catalog.indices.get(id) {
            Some(i) => i,
            None => return String::new(),
        };
        let columns = self.index_columns(catalog, id);
        let mut out = match index.index_type.to_uppercase().as_str() {
            "PRIMARY" => format!("PRIMARY KEY ({})", columns),
            "UNIQUE" => format!("UNIQUE INDEX {} ({})", quote_identifier(&index.name), columns),
            "FULLTEXT" => format!("FULLTEXT INDEX {} ({})", quote_identifier(&index.name), columns),
            "SPATIAL" => format!("SPATIAL INDEX {} ({})", quote_identifier(&index.name), columns),
            _ => format!("INDEX {} ({})", quote_identifier(&index.name), columns),
        };
        if !index.index_kind.is_empty() {
            out.push_str(&format!(" USING {}", index.index_kind));
        }
        if index.key_block_size > 0 {
            out.push_str(&format!(" KEY_BLOCK_SIZE = {}", index.key_block_size));
        }
        if !index.with_parser.is_empty() {
            out.push_str(&format!(" WITH PARSER {}", index.with_parser));
        }
        if !index.comment.is_empty() {
            out.push_str(&format!(" COMMENT {}", quote_string(&index.comment)));
        }
        out
    }

    pub fn drop_index_clause(&self, catalog: &Catalog, id: &ObjectId) -> String {
        match catalog.indices.get(id) {
            Some(index) if index.is_primary() => "DROP PRIMARY KEY".to_string(),
            Some(index) => format!("DROP INDEX {}", quote_identifier(&index.name)),
            None => String::new(),
        }
    }

    /// Foreign key definition, `None` when the referenced table is unknown
    pub fn foreign_key_definition(&self, catalog: &Catalog, id: &ObjectId) -> Option<String> {
        let fk = catalog.foreign_keys.get(id)?;
        let referenced = fk.referenced_table.as_ref().filter(|t| catalog.tables.contains_key(*t))?;
        let names = |ids: &Vec<ObjectId>| {
            ids.iter()
                .map(|c| quote_identifier(&catalog.name_of(c)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut out = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_identifier(&fk.name),
            names(&fk.columns),
            self.object_name(catalog, referenced),
            names(&fk.referenced_columns)
        );
        if !fk.delete_rule.is_empty() {
            out.push_str(&format!(" ON DELETE {}", fk.delete_rule));
        }
        if !fk.update_rule.is_empty() {
            out.push_str(&format!(" ON UPDATE {}", fk.update_rule));
        }
        Some(out)
    }

    pub fn drop_foreign_key_clause(&self, catalog: &Catalog, id: &ObjectId) -> String {
        format!("DROP FOREIGN KEY {}", quote_identifier(&catalog.name_of(id)))
    }

    /// Value of one table option clause, `None` when the option is unset
    pub fn table_option(&self, table: &Table, attr: &str) -> Option<String> {
        let (_, keyword) = TABLE_OPTIONS.iter().find(|(name, _)| *name == attr)?;
        let text = |value: &str| (!value.is_empty()).then(|| format!("{} = {}", keyword, value));
        match attr {
            "tableEngine" => text(&table.engine),
            "defaultCharacterSetName" => text(&table.default_charset),
            "defaultCollationName" => text(&table.default_collation),
            "comment" => Some(format!("{} = {}", keyword, quote_string(&table.comment))),
            "rowFormat" => text(&table.row_format),
            "packKeys" => text(&table.pack_keys),
            "keyBlockSize" => text(&table.key_block_size),
            "minRows" => text(&table.min_rows),
            "maxRows" => text(&table.max_rows),
            "avgRowLength" => text(&table.avg_row_length),
            "nextAutoInc" => text(&table.next_auto_inc),
            "checksum" => Some(format!("{} = {}", keyword, table.checksum)),
            "delayKeyWrite" => Some(format!("{} = {}", keyword, table.delay_key_write)),
            "password" => (!table.password.is_empty()).then(|| format!("{} = {}", keyword, quote_string(&table.password))),
            "mergeUnion" => (!table.merge_union.is_empty()).then(|| format!("{} = ({})", keyword, table.merge_union)),
            "mergeInsert" => text(&table.merge_insert),
            "connectionString" => (!table.connection_string.is_empty())
                .then(|| format!("{} = {}", keyword, quote_string(&table.connection_string))),
            _ => None,
        }
    }

    /// CREATE TABLE; foreign keys are inlined only when asked for
    pub fn create_table(&self, catalog: &Catalog, id: &ObjectId, with_foreign_keys: bool) -> String {
        let table = match catalog.tables.get(id) {
            Some(t) => t,
            None => return String::new(),
        };
        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(catalog, c))
            .collect();
        parts.extend(table.indices.iter().map(|i| self.index_definition(catalog, i)));
        if with_foreign_keys {
            parts.extend(
                table
                    .foreign_keys
                    .iter()
                    .filter(|fk| catalog.foreign_keys.get(*fk).map_or(false, |f| !f.model_only))
                    .filter_map(|fk| self.foreign_key_definition(catalog, fk)),
            );
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {})",
            self.object_name(catalog, id),
            parts.join(",\n  ")
        );
        for (attr, _) in TABLE_OPTIONS {
            let unset = match *attr {
                "comment" => table.comment.is_empty(),
                "checksum" => table.checksum == 0,
                "delayKeyWrite" => table.delay_key_write == 0,
                _ => false,
            };
            if unset {
                continue;
            }
            if let Some(option) = self.table_option(table, attr) {
                sql.push('\n');
                sql.push_str(&option);
            }
        }
        if !table.partition_type.is_empty() {
            sql.push('\n');
            sql.push_str(&partition_by_clause(catalog, table));
        }
        sql
    }

    pub fn drop_table(&self, catalog: &Catalog, id: &ObjectId) -> String {
        format!("DROP TABLE IF EXISTS {}", self.object_name(catalog, id))
    }

    pub fn create_schema(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let schema = match catalog.schemas.get(id) {
            Some(s) => s,
            None => return String::new(),
        };
        let mut sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_identifier(&schema.name));
        if !schema.default_charset.is_empty() {
            sql.push_str(&format!(" DEFAULT CHARACTER SET {}", schema.default_charset));
        }
        if !schema.default_collation.is_empty() {
            sql.push_str(&format!(" COLLATE {}", schema.default_collation));
        }
        sql
    }

    pub fn drop_schema(&self, catalog: &Catalog, id: &ObjectId) -> String {
        format!("DROP SCHEMA IF EXISTS {}", quote_identifier(&catalog.name_of(id)))
    }

    pub fn alter_schema(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let schema = match catalog.schemas.get(id) {
            Some(s) => s,
            None => return String::new(),
        };
        let mut sql = format!("ALTER SCHEMA {}", quote_identifier(&schema.name));
        if !schema.default_charset.is_empty() {
            sql.push_str(&format!(" DEFAULT CHARACTER SET {}", schema.default_charset));
        }
        if !schema.default_collation.is_empty() {
            sql.push_str(&format!(" DEFAULT COLLATE {}", schema.default_collation));
        }
        sql
    }

    pub fn create_view(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let view = match catalog.views.get(id) {
            Some(v) => v,
            None => return String::new(),
        };
        let definition = view.sql_definition.trim().trim_end_matches(';');
        if starts_with_create(definition) {
            return definition.to_string();
        }
        let mut sql = "CREATE OR REPLACE".to_string();
        if !view.algorithm.is_empty() {
            sql.push_str(&format!(" ALGORITHM = {}", view.algorithm));
        }
        if !view.definer.is_empty() {
            sql.push_str(&format!(" DEFINER = {}", view.definer));
        }
        sql.push_str(&format!(" VIEW {} AS {}", self.object_name(catalog, id), definition));
        if view.with_check_condition {
            sql.push_str(" WITH CHECK OPTION");
        }
        sql
    }

    pub fn drop_view(&self, catalog: &Catalog, id: &ObjectId) -> String {
        format!("DROP VIEW IF EXISTS {}", self.object_name(catalog, id))
    }

    pub fn create_routine(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let routine = match catalog.routines.get(id) {
            Some(r) => r,
            None => return String::new(),
        };
        let definition = routine.sql_definition.trim();
        if starts_with_create(definition) {
            return definition.to_string();
        }
        let mut sql = "CREATE".to_string();
        if !routine.definer.is_empty() {
            sql.push_str(&format!(" DEFINER = {}", routine.definer));
        }
        sql.push_str(&format!(
            " {} {} {}",
            routine_keyword(&routine.routine_type),
            self.object_name(catalog, id),
            definition
        ));
        sql
    }

    pub fn drop_routine(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let keyword = catalog
            .routines
            .get(id)
            .map(|r| routine_keyword(&r.routine_type))
            .unwrap_or("PROCEDURE");
        format!("DROP {} IF EXISTS {}", keyword, self.object_name(catalog, id))
    }

    pub fn create_trigger(&self, catalog: &Catalog, id: &ObjectId) -> String {
        let trigger = match catalog.triggers.get(id) {
            Some(t) => t,
            None => return String::new(),
        };
        let definition = trigger.sql_definition.trim();
        if starts_with_create(definition) {
            return definition.to_string();
        }
        let mut sql = "CREATE".to_string();
        if !trigger.definer.is_empty() {
            sql.push_str(&format!(" DEFINER = {}", trigger.definer));
        }
        sql.push_str(&format!(
            " TRIGGER {} {} {} ON {} FOR EACH ROW {}",
            self.object_name(catalog, id),
            trigger.timing,
            trigger.event,
            self.object_name(catalog, &trigger.owner),
            definition
        ));
        sql
    }

    pub fn drop_trigger(&self, catalog: &Catalog, id: &ObjectId) -> String {
        format!("DROP TRIGGER IF EXISTS {}", self.object_name(catalog, id))
    }
}

fn routine_keyword(routine_type: &str) -> &'static str {
    if routine_type.eq_ignore_ascii_case("FUNCTION") {
        "FUNCTION"
    } else {
        "PROCEDURE"
    }
}

fn starts_with_create(definition: &str) -> bool {
    definition
        .split_whitespace()
        .next()
        .map_or(false, |word| word.eq_ignore_ascii_case("CREATE"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Index, Schema, Table};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_definition_omits_null() {
        let mut catalog = Catalog::new("def");
        let schema = catalog.add_schema(Schema::new("test"));
        let table = catalog.add_table(&schema, Table::new("t1")).unwrap();
        let id = catalog
            .add_column(&table, Column::new("name", "VARCHAR(45)").not_null(true).default_value("'x'"))
            .unwrap();
        let t = catalog.add_column(&table, Column::new("t", "TEXT")).unwrap();

        let dialect = MysqlDialect::default();
        assert_eq!(dialect.column_definition(&catalog, &id), "`name` VARCHAR(45) NOT NULL DEFAULT 'x'");
        assert_eq!(dialect.column_definition(&catalog, &t), "`t` TEXT");
    }

    #[test]
    fn test_create_table_layout() {
        let mut catalog = Catalog::new("def");
        let schema = catalog.add_schema(Schema::new("test"));
        let table = catalog.add_table(&schema, Table::new("t1").engine("InnoDB")).unwrap();
        catalog.add_column(&table, Column::new("id", "INT").not_null(true)).unwrap();
        catalog.add_index(&table, Index::new("PRIMARY", "PRIMARY"), &["id"]).unwrap();

        let sql = MysqlDialect::default().create_table(&catalog, &table, true);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `test`.`t1` (\n  `id` INT NOT NULL,\n  PRIMARY KEY (`id`))\nENGINE = InnoDB"
        );
    }
}

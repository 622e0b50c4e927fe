//! SQL synchronization script generation
//!
//! Turns a catalog change tree into MySQL statements and composes them into
//! an executable script.

pub mod generator;
pub mod mysql;
pub mod options;
pub mod partition;
pub mod script;

pub use generator::{DiffSqlGenerator, SqlOutput};
pub use mysql::MysqlDialect;
pub use options::GeneratorOptions;
pub use partition::{partition_by_clause, partition_clauses, PartitionTransform};
pub use script::make_sql_sync_script;

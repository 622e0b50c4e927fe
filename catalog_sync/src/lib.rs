//! catalog_sync: diff and synchronize MySQL schema models with live database catalogs
//!
//! catalog_sync compares two in-memory catalogs (a model and the catalog
//! reverse engineered from a server), produces a tree of changes, renders
//! that tree as an executable SQL script and can apply server-side changes
//! back onto the model.

pub mod catalog;
pub mod config;
pub mod diff;
pub mod error;
pub mod sql;
pub mod sync;
pub mod utils;

use std::path::Path;

// Re-export main types for easier access
pub use catalog::{Catalog, ObjectId, ObjectKind, ObjectRef};
pub use config::Config;
pub use diff::{diff_make, ChangeTree, Omf};
pub use error::{Error, Result};
pub use sql::{make_sql_sync_script, DiffSqlGenerator, GeneratorOptions, SqlOutput};
pub use sync::{ApplyDirection, DiffTree, NodeId, ReportAction, SyncReport, SyncSession, SyncSettings};

/// Initialize catalog_sync with the specified configuration file
pub fn init(config_path: &str) -> Result<CatalogSyncClient> {
    let config = config::load_from_file(config_path)?;
    Ok(CatalogSyncClient::new(config))
}

/// Entry point that opens synchronization sessions from configuration
pub struct CatalogSyncClient {
    config: Config,
    settings: SyncSettings,
}

impl CatalogSyncClient {
    pub fn new(config: Config) -> Self {
        let settings = SyncSettings::from_config(&config);
        Self { config, settings }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a session over two catalogs, wired to the configured profile store
    pub fn session(&self, model: Catalog, external: Catalog) -> SyncSession {
        let session = SyncSession::new(model, external, self.settings.clone());
        match (&self.config.sync.profile_name, &self.config.sync.profile_file) {
            (Some(name), Some(file)) => {
                session.with_profile_store(name, Box::new(sync::JsonFileProfileStore::new(file)))
            }
            _ => session,
        }
    }

    /// Load the model and database catalog documents and open a session over them
    ///
    /// The model document is attached to the session so saving a sync profile
    /// persists the object ids the profile refers to.
    pub fn open(&self, model_path: &Path, external_path: &Path) -> Result<SyncSession> {
        let model = catalog::load_catalog(model_path)?;
        let external = catalog::load_catalog(external_path)?;
        tracing::info!(
            model = %model_path.display(),
            external = %external_path.display(),
            "Loaded catalog documents"
        );
        Ok(self.session(model, external).with_model_document(model_path))
    }

    /// Complete workflow: diff both documents and return the script for the database
    pub fn sync_script(&self, model_path: &Path, external_path: &Path) -> Result<String> {
        let mut session = self.open(model_path, external_path)?;
        let tree = session.init_diff_tree(&[])?;
        if tree.changes().is_none() {
            tracing::info!("Database catalog is already in sync with the model");
            return Ok(String::new());
        }
        Ok(session.generate_diff_tree_script())
    }
}

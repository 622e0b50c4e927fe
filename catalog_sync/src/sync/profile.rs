//! Sync profiles
//!
//! A profile remembers, per model and schema, the names objects had in the
//! database after the last synchronization. Restoring it seeds old names so
//! that renames done in the model since then are recognized as renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::catalog::types::{Catalog, ObjectId, ObjectKind};
use crate::error::{Error, Result};

/// Object id to the name it last had in the database
pub type NameMap = BTreeMap<ObjectId, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProfile {
    pub name: String,
    pub last_known_names: NameMap,
    pub last_sync: DateTime<Utc>,
}

impl SyncProfile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            last_known_names: NameMap::new(),
            last_sync: Utc::now(),
        }
    }

    /// Capture the current names of a schema and everything in it
    pub fn from_schema(name: &str, catalog: &Catalog, schema_id: &ObjectId) -> Self {
        let mut profile = Self::new(name);
        for id in catalog.subtree_ids(schema_id) {
            if tracks_old_name(catalog.kind_of(&id)) {
                profile.last_known_names.insert(id.clone(), catalog.name_of(&id));
            }
        }
        profile
    }

    /// Seed old names of a schema's objects from the profile
    ///
    /// Returns how many objects got an old name.
    pub fn apply_to_schema(&self, catalog: &mut Catalog, schema_id: &ObjectId) -> usize {
        let mut seeded = 0;
        for id in catalog.subtree_ids(schema_id) {
            if let Some(name) = self.last_known_names.get(&id) {
                catalog.set_old_name(&id, name);
                seeded += 1;
            }
        }
        seeded
    }
}

fn tracks_old_name(kind: Option<ObjectKind>) -> bool {
    !matches!(
        kind,
        None | Some(ObjectKind::Catalog) | Some(ObjectKind::IndexColumn) | Some(ObjectKind::Partition)
    )
}

/// Persistence of sync profiles keyed by model identity and schema name
pub trait SyncProfileStore: Send + Sync {
    fn get(&self, model_id: &str, schema: &str) -> Result<Option<SyncProfile>>;
    fn put(&self, model_id: &str, schema: &str, profile: SyncProfile) -> Result<()>;
}

fn store_key(model_id: &str, schema: &str) -> String {
    format!("{}::{}", model_id, schema)
}

/// Profiles kept for the lifetime of the process
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<String, SyncProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncProfileStore for InMemoryProfileStore {
    fn get(&self, model_id: &str, schema: &str) -> Result<Option<SyncProfile>> {
        let profiles = self
            .profiles
            .lock()
            .map_err(|_| Error::Profile("Profile store lock poisoned".to_string()))?;
        Ok(profiles.get(&store_key(model_id, schema)).cloned())
    }

    fn put(&self, model_id: &str, schema: &str, profile: SyncProfile) -> Result<()> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|_| Error::Profile("Profile store lock poisoned".to_string()))?;
        profiles.insert(store_key(model_id, schema), profile);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileDocument {
    profiles: BTreeMap<String, SyncProfile>,
}

/// Profiles stored together in one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileProfileStore {
    path: PathBuf,
}

impl JsonFileProfileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<ProfileDocument> {
        if !self.path.exists() {
            return Ok(ProfileDocument::default());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(ProfileDocument::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::Profile(format!("Failed to parse {}: {}", self.path.display(), e)))
    }
}

impl SyncProfileStore for JsonFileProfileStore {
    fn get(&self, model_id: &str, schema: &str) -> Result<Option<SyncProfile>> {
        Ok(self.read()?.profiles.remove(&store_key(model_id, schema)))
    }

    fn put(&self, model_id: &str, schema: &str, profile: SyncProfile) -> Result<()> {
        let mut document = self.read()?;
        document.profiles.insert(store_key(model_id, schema), profile);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        debug!(path = %self.path.display(), model_id, schema, "Stored sync profile");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Schema, Table};
    use pretty_assertions::assert_eq;

    fn catalog() -> (Catalog, ObjectId, ObjectId) {
        let mut catalog = Catalog::new("def");
        let schema = catalog.add_schema(Schema::new("shop"));
        let table = catalog.add_table(&schema, Table::new("orders")).unwrap();
        catalog.add_column(&table, Column::new("id", "INT")).unwrap();
        (catalog, schema, table)
    }

    #[test]
    fn test_profile_round_trip_through_schema() {
        let (mut catalog, schema, table) = catalog();
        let profile = SyncProfile::from_schema("local", &catalog, &schema);
        assert_eq!(profile.last_known_names.get(&table).map(String::as_str), Some("orders"));

        catalog.tables[&table].name = "purchases".to_string();
        let seeded = profile.apply_to_schema(&mut catalog, &schema);
        assert_eq!(seeded, 3);
        assert_eq!(catalog.tables[&table].old_name, "orders");
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryProfileStore::new();
        assert!(store.get("model", "shop").unwrap().is_none());
        store.put("model", "shop", SyncProfile::new("local")).unwrap();
        assert_eq!(store.get("model", "shop").unwrap().unwrap().name, "local");
        assert!(store.get("other", "shop").unwrap().is_none());
    }
}

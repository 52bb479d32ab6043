//! JSON snapshot codec over a key/value store.

use super::{CatalogPersistence, LoadedCatalog, PersistenceError};
use crate::kv::KeyValueStore;
use crate::model::material::Material;
use crate::store::MaterialStore;
use log::{error, info, warn};

/// Key the catalog blob lives under.
pub const DEFAULT_STORAGE_KEY: &str = "study_materials";
/// Appended to the storage key to keep a copy of a discarded corrupt blob.
pub const CORRUPT_BACKUP_SUFFIX: &str = ".corrupt";

/// `CatalogPersistence` writing one JSON array under a fixed key.
///
/// Timestamps are encoded as RFC 3339 text and parsed back on load.
pub struct KvSnapshotStore<S: KeyValueStore> {
    kv: S,
    key: String,
}

impl<S: KeyValueStore> KvSnapshotStore<S> {
    /// Uses `DEFAULT_STORAGE_KEY`.
    pub fn new(kv: S) -> Self {
        Self::with_key(kv, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(kv: S, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    fn backup_key(&self) -> String {
        format!("{}{CORRUPT_BACKUP_SUFFIX}", self.key)
    }

    fn recover(&self, raw: &str, reason: String) -> LoadedCatalog {
        warn!(
            "event=catalog_load module=persistence status=recovered reason=corrupt_blob bytes={}",
            raw.len()
        );
        if let Err(err) = self.kv.set(&self.backup_key(), raw) {
            error!(
                "event=catalog_backup module=persistence status=error error={}",
                err
            );
        }
        LoadedCatalog {
            materials: Vec::new(),
            recovered_from: Some(PersistenceError::CorruptOnLoad(reason)),
        }
    }
}

impl<S: KeyValueStore> CatalogPersistence for KvSnapshotStore<S> {
    fn save(&self, materials: &[Material]) -> Result<(), PersistenceError> {
        let blob = serde_json::to_string(materials).map_err(PersistenceError::SerializeFailed)?;
        self.kv.set(&self.key, &blob).map_err(|err| {
            error!(
                "event=catalog_save module=persistence status=error count={} error={}",
                materials.len(),
                err
            );
            PersistenceError::WriteFailed(err)
        })?;
        info!(
            "event=catalog_save module=persistence status=ok count={} bytes={}",
            materials.len(),
            blob.len()
        );
        Ok(())
    }

    fn load(&self) -> Result<LoadedCatalog, PersistenceError> {
        let raw = self
            .kv
            .get(&self.key)
            .map_err(PersistenceError::ReadFailed)?;
        let Some(raw) = raw else {
            info!("event=catalog_load module=persistence status=ok count=0 blob=absent");
            return Ok(LoadedCatalog::default());
        };

        let materials = match serde_json::from_str::<Vec<Material>>(&raw) {
            Ok(materials) => materials,
            Err(err) => return Ok(self.recover(&raw, err.to_string())),
        };
        // Reuse the store's uniqueness and validation rules.
        if let Err(err) = MaterialStore::from_snapshot(materials.clone()) {
            return Ok(self.recover(&raw, err.to_string()));
        }

        info!(
            "event=catalog_load module=persistence status=ok count={}",
            materials.len()
        );
        Ok(LoadedCatalog {
            materials,
            recovered_from: None,
        })
    }
}

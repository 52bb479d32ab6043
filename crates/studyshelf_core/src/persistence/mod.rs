//! Whole-catalog snapshot persistence.
//!
//! # Responsibility
//! - Define the `CatalogPersistence` seam the catalog writes through.
//! - Serialize the entire ordered catalog as one blob under one key.
//!
//! # Invariants
//! - `save` either makes the new snapshot durable or leaves the prior one.
//! - `load` never fails because of a corrupt blob; it reports and recovers.
//!
//! # See also
//! - crates/studyshelf_core/src/kv/mod.rs

mod snapshot;

pub use snapshot::{KvSnapshotStore, CORRUPT_BACKUP_SUFFIX, DEFAULT_STORAGE_KEY};

use crate::kv::KvError;
use crate::model::material::Material;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persistence failure kinds.
#[derive(Debug)]
pub enum PersistenceError {
    /// The in-memory catalog could not be encoded.
    SerializeFailed(serde_json::Error),
    /// The durable store rejected the write; the previous blob remains.
    WriteFailed(KvError),
    /// The durable store could not be read at all.
    ReadFailed(KvError),
    /// A stored blob exists but does not decode into a valid catalog.
    CorruptOnLoad(String),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializeFailed(err) => write!(f, "catalog serialization failed: {err}"),
            Self::WriteFailed(err) => write!(f, "catalog write failed: {err}"),
            Self::ReadFailed(err) => write!(f, "catalog read failed: {err}"),
            Self::CorruptOnLoad(details) => write!(f, "stored catalog is corrupt: {details}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SerializeFailed(err) => Some(err),
            Self::WriteFailed(err) | Self::ReadFailed(err) => Some(err),
            Self::CorruptOnLoad(_) => None,
        }
    }
}

/// Result of loading a snapshot.
#[derive(Debug, Default)]
pub struct LoadedCatalog {
    /// Materials in stored (newest-first) order.
    pub materials: Vec<Material>,
    /// Set when a corrupt blob was discarded in favour of an empty catalog.
    pub recovered_from: Option<PersistenceError>,
}

/// Durable storage for whole-catalog snapshots.
pub trait CatalogPersistence {
    /// Replaces the stored snapshot with `materials`.
    fn save(&self, materials: &[Material]) -> Result<(), PersistenceError>;
    /// Reads the stored snapshot.
    ///
    /// Missing and corrupt blobs both yield an empty catalog; only the
    /// latter sets `recovered_from`.
    fn load(&self) -> Result<LoadedCatalog, PersistenceError>;
}

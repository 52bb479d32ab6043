//! Core domain logic for the StudyShelf material catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod auth;
pub mod clock;
pub mod collab;
pub mod config;
pub mod db;
pub mod ingest;
pub mod kv;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod search;
pub mod service;
pub mod store;

pub use auth::{AuthSession, DummyTokenAuth};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collab::{DocumentViewer, FilePicker};
pub use config::{CatalogConfig, ConfigError};
pub use ingest::{FileIngestionService, IngestedFile, IngestionError, PickedFile};
pub use kv::{KeyValueStore, KvError, KvResult, MemoryKeyValueStore, SqliteKeyValueStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::material::{Material, MaterialId, MaterialKind, MaterialValidationError};
pub use persistence::{CatalogPersistence, KvSnapshotStore, LoadedCatalog, PersistenceError};
pub use search::query::{MaterialMatcher, MaterialOrder, MaterialQuery};
pub use service::catalog::{AddPdfOutcome, Catalog, CatalogError, CatalogResult};
pub use store::{MaterialStore, StoreError, StoreResult};

/// Catalog backed by the SQLite key/value store, as used by the app.
pub type AppCatalog = Catalog<KvSnapshotStore<SqliteKeyValueStore>>;

/// Error raised while opening an `AppCatalog` from configuration.
#[derive(Debug)]
pub enum OpenCatalogError {
    Kv(KvError),
    Catalog(CatalogError),
}

impl std::fmt::Display for OpenCatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kv(err) => write!(f, "catalog storage unavailable: {err}"),
            Self::Catalog(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for OpenCatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Catalog(err) => Some(err),
        }
    }
}

/// Opens the SQLite-backed catalog laid out by `config`.
pub fn open_app_catalog(config: &CatalogConfig) -> Result<AppCatalog, OpenCatalogError> {
    let kv = SqliteKeyValueStore::open(config.db_path()).map_err(OpenCatalogError::Kv)?;
    let persistence = KvSnapshotStore::with_key(kv, config.storage_key.clone());
    let ingestion = FileIngestionService::new(config.storage_dir());
    Catalog::open(persistence, ingestion).map_err(OpenCatalogError::Catalog)
}

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Study material catalog use-cases.
//!
//! # Responsibility
//! - Provide the add/query/mutate surface consumed by the UI layer.
//! - Sequence ingestion, in-memory mutation and write-through persistence.
//!
//! # Invariants
//! - An ingested file is linked into the store only after the copy succeeded.
//! - Every successful mutation has been saved before the call returns.
//! - A failed save keeps the in-memory mutation and marks the catalog dirty.
//! - `last_accessed` strictly increases per entry.

use crate::clock::{Clock, SystemClock};
use crate::collab::{DocumentViewer, FilePicker};
use crate::ingest::{FileIngestionService, IngestionError, PickedFile};
use crate::model::material::{Material, MaterialId, MaterialValidationError};
use crate::persistence::{CatalogPersistence, PersistenceError};
use crate::search::query::{MaterialOrder, MaterialQuery};
use crate::store::{MaterialStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error surfaced by catalog use-cases.
#[derive(Debug)]
pub enum CatalogError {
    NotFound(MaterialId),
    Validation(MaterialValidationError),
    Ingestion(IngestionError),
    /// The mutation was applied in memory but could not be saved.
    Persistence(PersistenceError),
    /// Store rejected a write for a reason other than the ones above.
    Store(StoreError),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "material not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Ingestion(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Validation(err) => Some(err),
            Self::Ingestion(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl From<MaterialValidationError> for CatalogError {
    fn from(value: MaterialValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<IngestionError> for CatalogError {
    fn from(value: IngestionError) -> Self {
        Self::Ingestion(value)
    }
}

impl From<PersistenceError> for CatalogError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Result of `Catalog::add_pdf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddPdfOutcome {
    Added(Material),
    /// The picker was dismissed; nothing changed.
    Cancelled,
}

/// Catalog facade over the store, ingestion and persistence.
pub struct Catalog<P: CatalogPersistence, C: Clock = SystemClock> {
    store: MaterialStore,
    persistence: P,
    ingestion: FileIngestionService,
    clock: C,
    dirty: bool,
}

impl<P: CatalogPersistence> Catalog<P, SystemClock> {
    /// Opens the catalog using the wall clock.
    pub fn open(persistence: P, ingestion: FileIngestionService) -> CatalogResult<Self> {
        Self::open_with_clock(persistence, ingestion, SystemClock)
    }
}

impl<P: CatalogPersistence, C: Clock> Catalog<P, C> {
    /// Loads the persisted snapshot and prepares managed storage.
    ///
    /// A corrupt snapshot is logged and replaced by an empty catalog.
    ///
    /// # Errors
    /// - `Persistence(ReadFailed)` when the durable store cannot be read.
    pub fn open_with_clock(
        persistence: P,
        ingestion: FileIngestionService,
        clock: C,
    ) -> CatalogResult<Self> {
        let loaded = persistence.load()?;
        if let Some(reason) = &loaded.recovered_from {
            warn!(
                "event=catalog_open module=catalog status=recovered error={}",
                reason
            );
        }
        let store = MaterialStore::from_snapshot(loaded.materials)?;

        if let Err(err) = ingestion.sweep_partials() {
            warn!(
                "event=catalog_open module=catalog status=warn error_code=sweep_failed error={}",
                err
            );
        }

        info!(
            "event=catalog_open module=catalog status=ok count={}",
            store.len()
        );
        Ok(Self {
            store,
            persistence,
            ingestion,
            clock,
            dirty: false,
        })
    }

    /// Creates a note entry.
    ///
    /// # Errors
    /// - `Validation(EmptyTitle)` for a blank title.
    /// - `Persistence` when the save failed; the note stays in memory.
    pub fn add_note(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> CatalogResult<Material> {
        let material = Material::note(title, content, self.clock.now())?;
        self.store.insert(material.clone())?;
        info!("event=add_note module=catalog status=ok id={}", material.id);
        self.write_through()?;
        Ok(material)
    }

    /// Asks `picker` for a PDF and ingests it.
    ///
    /// Cancellation is not an error and changes nothing.
    pub fn add_pdf(&mut self, picker: &mut dyn FilePicker) -> CatalogResult<AddPdfOutcome> {
        match picker.pick_pdf() {
            None => {
                info!("event=add_pdf module=catalog status=cancelled");
                Ok(AddPdfOutcome::Cancelled)
            }
            Some(file) => self.add_picked_pdf(&file).map(AddPdfOutcome::Added),
        }
    }

    /// Ingests an already picked file and links it into the catalog.
    ///
    /// # Errors
    /// - `Ingestion` when the copy failed; the catalog is unchanged.
    /// - `Persistence` when the save failed; the entry stays in memory.
    pub fn add_picked_pdf(&mut self, file: &PickedFile) -> CatalogResult<Material> {
        let now = self.clock.now();
        let ingested = self.ingestion.ingest(file, now)?;
        let title = match file.name.trim() {
            "" => ingested.stored_name.as_str(),
            name => name,
        };

        let linked = Material::pdf(title, ingested.uri.as_str(), ingested.file_size, now)
            .map_err(CatalogError::from)
            .and_then(|material| {
                self.store.insert(material.clone())?;
                Ok(material)
            });
        let material = match linked {
            Ok(material) => material,
            Err(err) => {
                // Never linked, so the copy has no owner.
                let _ = std::fs::remove_file(&ingested.uri);
                return Err(err);
            }
        };
        info!(
            "event=add_pdf module=catalog status=ok id={} bytes={}",
            material.id, ingested.file_size
        );
        self.write_through()?;
        Ok(material)
    }

    /// Flips the favourite flag.
    pub fn toggle_favorite(&mut self, id: &MaterialId) -> CatalogResult<Material> {
        let updated = self
            .store
            .update(id, |material| material.is_favorite = !material.is_favorite)?;
        self.write_through()?;
        Ok(updated)
    }

    /// Stamps `last_accessed` with the current time.
    ///
    /// The stamp is bumped past the previous one (and past `created_at`)
    /// when the clock has not moved, so it always strictly increases.
    ///
    /// # Errors
    /// - `Validation(AccessStampExhausted)` when the stored stamp is already
    ///   at the largest representable instant.
    pub fn record_access(&mut self, id: &MaterialId) -> CatalogResult<Material> {
        let current = self
            .store
            .get(id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        let stamp = next_access_stamp(&current, self.clock.now())
            .ok_or_else(|| MaterialValidationError::AccessStampExhausted(id.clone()))?;
        let updated = self
            .store
            .update(id, |material| material.last_accessed = Some(stamp))?;
        self.write_through()?;
        Ok(updated)
    }

    /// Records an access and hands the entry's `uri` to `viewer`.
    ///
    /// # Errors
    /// - `Validation(NotOpenable)` for entries without a `uri`.
    /// - `Persistence` when the access stamp could not be saved; the viewer
    ///   is still invoked.
    pub fn open_material(
        &mut self,
        id: &MaterialId,
        viewer: &mut dyn DocumentViewer,
    ) -> CatalogResult<Material> {
        let material = self
            .store
            .get(id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        let Some(uri) = material.uri else {
            return Err(MaterialValidationError::NotOpenable(id.clone()).into());
        };

        let recorded = self.record_access(id);
        viewer.open(&uri);
        recorded
    }

    /// Replaces the tag list verbatim (order and duplicates kept).
    pub fn set_tags(&mut self, id: &MaterialId, tags: Vec<String>) -> CatalogResult<Material> {
        let updated = self.store.update(id, |material| material.tags = tags)?;
        self.write_through()?;
        Ok(updated)
    }

    /// Filters the catalog in the query's order.
    pub fn search(&self, query: &MaterialQuery) -> Vec<Material> {
        let matcher = query.matcher();
        match query.order {
            MaterialOrder::Newest => self.store.select(|material| matcher.matches(material)),
            order => self
                .store
                .select_sorted(|material| matcher.matches(material), |a, b| order.compare(a, b)),
        }
    }

    /// All entries, newest first.
    pub fn list(&self) -> Vec<Material> {
        self.store.list()
    }

    pub fn get(&self, id: &MaterialId) -> Option<Material> {
        self.store.get(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Whether in-memory state is ahead of durable storage.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Saves the current state again, e.g. after a failed write-through.
    pub fn flush(&mut self) -> CatalogResult<()> {
        self.write_through()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn write_through(&mut self) -> CatalogResult<()> {
        match self.persistence.save(&self.store.list()) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                self.dirty = true;
                error!(
                    "event=write_through module=catalog status=error dirty=true error={}",
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn next_access_stamp(material: &Material, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let floor = match material.last_accessed {
        Some(previous) => previous.checked_add_signed(Duration::milliseconds(1))?,
        None => material.created_at,
    };
    Some(now.max(floor))
}

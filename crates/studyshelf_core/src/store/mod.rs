//! In-memory authoritative material collection.
//!
//! # Responsibility
//! - Hold the canonical ordered set of catalog entries keyed by id.
//! - Reject writes that would break id uniqueness or entry validation.
//!
//! # Invariants
//! - Ids are unique.
//! - Iteration order is newest insertion first; updates never re-sort.
//! - `id` and `created_at` cannot be changed through `update`.
//! - Callers only ever receive clones.

use crate::model::material::{Material, MaterialId, MaterialValidationError};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    DuplicateId(MaterialId),
    NotFound(MaterialId),
    Validation(MaterialValidationError),
    /// An update tried to rewrite `id` or `created_at`.
    ImmutableField {
        id: MaterialId,
        field: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "material id already present: {id}"),
            Self::NotFound(id) => write!(f, "material not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::ImmutableField { id, field } => {
                write!(f, "field `{field}` of material {id} is immutable")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MaterialValidationError> for StoreError {
    fn from(value: MaterialValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Ordered map of materials.
///
/// Entries are keyed by an insertion sequence number; iterating the map in
/// reverse yields newest-first order without shifting on every prepend.
#[derive(Debug, Clone, Default)]
pub struct MaterialStore {
    entries: BTreeMap<u64, Material>,
    positions: HashMap<MaterialId, u64>,
    next_seq: u64,
}

impl MaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a newest-first snapshot.
    ///
    /// # Errors
    /// - `DuplicateId` when the snapshot repeats an id.
    /// - `Validation` when any entry is invalid.
    pub fn from_snapshot(snapshot: Vec<Material>) -> StoreResult<Self> {
        let mut store = Self::new();
        // Oldest first, so the first snapshot element ends up newest.
        for material in snapshot.into_iter().rev() {
            store.insert(material)?;
        }
        Ok(store)
    }

    /// Adds `material` as the newest entry.
    pub fn insert(&mut self, material: Material) -> StoreResult<()> {
        if self.contains(&material.id) {
            return Err(StoreError::DuplicateId(material.id));
        }
        material.validate()?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.positions.insert(material.id.clone(), seq);
        self.entries.insert(seq, material);
        Ok(())
    }

    /// Applies `mutator` to the entry with `id` in place and returns the
    /// updated value.
    ///
    /// A rejected mutation leaves the stored entry untouched.
    pub fn update<F>(&mut self, id: &MaterialId, mutator: F) -> StoreResult<Material>
    where
        F: FnOnce(&mut Material),
    {
        let seq = *self
            .positions
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let entry = self
            .entries
            .get_mut(&seq)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut candidate = entry.clone();
        mutator(&mut candidate);

        if candidate.id != entry.id {
            return Err(StoreError::ImmutableField {
                id: id.clone(),
                field: "id",
            });
        }
        if candidate.created_at != entry.created_at {
            return Err(StoreError::ImmutableField {
                id: id.clone(),
                field: "created_at",
            });
        }
        candidate.validate()?;

        *entry = candidate;
        Ok(entry.clone())
    }

    pub fn get(&self, id: &MaterialId) -> Option<Material> {
        self.positions
            .get(id)
            .and_then(|seq| self.entries.get(seq))
            .cloned()
    }

    pub fn contains(&self, id: &MaterialId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, newest first.
    pub fn list(&self) -> Vec<Material> {
        self.select(|_| true)
    }

    /// Entries accepted by `predicate`, newest first.
    pub fn select<P>(&self, predicate: P) -> Vec<Material>
    where
        P: Fn(&Material) -> bool,
    {
        self.iter().filter(|m| predicate(m)).cloned().collect()
    }

    /// Entries accepted by `predicate`, ordered by `comparator`.
    ///
    /// The sort is stable, so ties keep newest-first order.
    pub fn select_sorted<P, C>(&self, predicate: P, comparator: C) -> Vec<Material>
    where
        P: Fn(&Material) -> bool,
        C: FnMut(&Material, &Material) -> Ordering,
    {
        let mut selected = self.select(predicate);
        selected.sort_by(comparator);
        selected
    }

    fn iter(&self) -> impl Iterator<Item = &Material> {
        self.entries.values().rev()
    }
}

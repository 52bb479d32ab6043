//! Catalog domain model.
//!
//! # Responsibility
//! - Define the canonical catalog entry and its validation rules.
//!
//! # Invariants
//! - Every entry is identified by a stable `MaterialId`.
//! - Entries are never hard-deleted; there is no tombstone either.

pub mod material;

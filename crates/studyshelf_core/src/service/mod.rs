//! Use-case service layer.
//!
//! # Responsibility
//! - Orchestrate store, ingestion and persistence for UI callers.
//!
//! # Invariants
//! - Services remain storage-agnostic behind `CatalogPersistence`.

pub mod catalog;

//! Catalog query module.
//!
//! # Responsibility
//! - Expose the in-memory filter used by `Catalog::search`.

pub mod query;

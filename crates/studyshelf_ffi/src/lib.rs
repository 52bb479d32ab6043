//! Flutter bridge for the StudyShelf catalog.

pub mod api;

//! Contracts for collaborators owned by the host UI.
//!
//! The system file picker and document viewer live outside the core; the
//! catalog only calls them through these traits.

use crate::ingest::PickedFile;

/// System file picker restricted to PDF documents.
pub trait FilePicker {
    /// Returns the chosen file, or `None` when the user cancelled.
    fn pick_pdf(&mut self) -> Option<PickedFile>;
}

/// External viewer for stored documents.
pub trait DocumentViewer {
    fn open(&mut self, uri: &str);
}

//! Material domain model.
//!
//! # Responsibility
//! - Define the catalog entry shared by note/pdf/link resources.
//! - Validate field combinations before an entry reaches the store.
//!
//! # Invariants
//! - `id` is stable and never reused for another material.
//! - `created_at` is set once; `last_accessed` never precedes it.
//! - `uri` is required for `pdf` entries and absent for `note` entries.
//! - `file_size` is present only together with `uri`.
//!
//! # See also
//! - crates/studyshelf_core/src/persistence/snapshot.rs (blob wire format)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable, opaque identifier for one catalog entry.
///
/// New entries get a UUID string. Stored blobs may carry any non-blank
/// string (older app builds wrote epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(String);

impl MaterialId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an externally supplied id verbatim.
    ///
    /// # Errors
    /// - `BlankId` when `raw` is empty or whitespace only.
    pub fn parse(raw: impl Into<String>) -> Result<Self, MaterialValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(MaterialValidationError::BlankId);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MaterialId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a study resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Free-form study note authored in app.
    Note,
    /// PDF copied into managed storage.
    Pdf,
    /// External link.
    Link,
}

impl MaterialKind {
    /// Stable lowercase label, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Pdf => "pdf",
            Self::Link => "link",
        }
    }
}

/// Validation failures for material field combinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialValidationError {
    /// `id` is empty or whitespace only.
    BlankId,
    /// `title` is empty or whitespace only.
    EmptyTitle,
    /// A tag is empty or whitespace only.
    EmptyTag,
    /// `pdf` entries must reference a stored file.
    MissingUri,
    /// `pdf` entries must carry the stored file size.
    MissingFileSize,
    /// `note` entries never reference a stored file.
    UnexpectedUri,
    /// `file_size` was set without a `uri`.
    FileSizeWithoutUri,
    /// `last_accessed` is earlier than `created_at`.
    AccessedBeforeCreated {
        created_at: DateTime<Utc>,
        last_accessed: DateTime<Utc>,
    },
    /// Entry has no `uri`, so there is nothing to open.
    NotOpenable(MaterialId),
    /// `last_accessed` is already at the latest representable instant.
    AccessStampExhausted(MaterialId),
}

impl Display for MaterialValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "material id cannot be empty"),
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::EmptyTag => write!(f, "tags cannot be empty"),
            Self::MissingUri => write!(f, "pdf material requires a uri"),
            Self::MissingFileSize => write!(f, "pdf material requires a file_size"),
            Self::UnexpectedUri => write!(f, "note material cannot carry a uri"),
            Self::FileSizeWithoutUri => write!(f, "file_size requires a uri"),
            Self::AccessedBeforeCreated {
                created_at,
                last_accessed,
            } => write!(
                f,
                "last_accessed ({}) is earlier than created_at ({})",
                last_accessed.to_rfc3339(),
                created_at.to_rfc3339()
            ),
            Self::NotOpenable(id) => write!(f, "material {id} has no uri to open"),
            Self::AccessStampExhausted(id) => {
                write!(f, "material {id} cannot record a later access time")
            }
        }
    }
}

impl Error for MaterialValidationError {}

/// Canonical catalog entry.
///
/// Serialized with camelCase field names and `type` for the kind, which is
/// the shape of the persisted catalog blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display order is significant; duplicates are kept.
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Managed storage locator. Absolute path of the stored copy for pdfs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Byte length of the file behind `uri`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl Material {
    /// Creates a note entry with a generated id.
    ///
    /// Blank bodies are stored as an absent description.
    pub fn note(
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MaterialValidationError> {
        let body = body.into();
        let trimmed = body.trim();
        let mut material = Self::blank(MaterialKind::Note, title.into(), created_at);
        material.description = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        material.validate()?;
        Ok(material)
    }

    /// Creates a pdf entry for a file that already sits in managed storage.
    pub fn pdf(
        title: impl Into<String>,
        uri: impl Into<String>,
        file_size: u64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MaterialValidationError> {
        let mut material = Self::blank(MaterialKind::Pdf, title.into(), created_at);
        material.uri = Some(uri.into());
        material.file_size = Some(file_size);
        material.validate()?;
        Ok(material)
    }

    fn blank(kind: MaterialKind, title: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: MaterialId::generate(),
            title: title.trim().to_string(),
            kind,
            description: None,
            tags: Vec::new(),
            created_at,
            last_accessed: None,
            is_favorite: false,
            uri: None,
            file_size: None,
        }
    }

    /// Checks every field-combination rule of the catalog.
    ///
    /// # Errors
    /// - Returns the first violated rule.
    pub fn validate(&self) -> Result<(), MaterialValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(MaterialValidationError::BlankId);
        }
        if self.title.trim().is_empty() {
            return Err(MaterialValidationError::EmptyTitle);
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(MaterialValidationError::EmptyTag);
        }

        match self.kind {
            MaterialKind::Pdf => {
                if self.uri.is_none() {
                    return Err(MaterialValidationError::MissingUri);
                }
                if self.file_size.is_none() {
                    return Err(MaterialValidationError::MissingFileSize);
                }
            }
            MaterialKind::Note => {
                if self.uri.is_some() {
                    return Err(MaterialValidationError::UnexpectedUri);
                }
            }
            MaterialKind::Link => {}
        }

        if self.file_size.is_some() && self.uri.is_none() {
            return Err(MaterialValidationError::FileSizeWithoutUri);
        }

        if let Some(last_accessed) = self.last_accessed {
            if last_accessed < self.created_at {
                return Err(MaterialValidationError::AccessedBeforeCreated {
                    created_at: self.created_at,
                    last_accessed,
                });
            }
        }

        Ok(())
    }

    /// Returns whether this entry points at something the viewer can open.
    pub fn is_openable(&self) -> bool {
        self.uri.is_some()
    }
}

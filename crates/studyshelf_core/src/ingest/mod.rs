//! File ingestion into app-managed storage.
//!
//! # Responsibility
//! - Copy an externally picked file into the managed storage directory.
//! - Choose collision-free destination names.
//! - Guarantee that a returned locator always has a complete backing file.
//!
//! # Invariants
//! - Bytes are written to a hidden `.partial` file and renamed into place
//!   only after a verified, fsynced copy.
//! - A failed ingestion leaves no file under its final name.
//! - Only this module writes into the managed directory.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const PARTIAL_PREFIX: &str = ".";
const PARTIAL_SUFFIX: &str = ".partial";
const FALLBACK_FILE_NAME: &str = "document";
const MAX_NAME_ATTEMPTS: u32 = 1000;

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid file name regex"));

/// File reference handed over by the file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    /// Original display name, e.g. `calc.pdf`.
    pub name: String,
    /// Readable location of the picked bytes.
    pub source: PathBuf,
}

impl PickedFile {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    /// Absolute locator of the stored copy.
    pub uri: String,
    /// Exact byte length of the stored copy.
    pub file_size: u64,
    /// File name inside the managed directory.
    pub stored_name: String,
}

#[derive(Debug)]
pub enum IngestionError {
    SourceUnreadable { source: PathBuf, cause: io::Error },
    DestinationUnwritable { dir: PathBuf, cause: io::Error },
    CopyFailed { destination: PathBuf, cause: io::Error },
}

impl Display for IngestionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnreadable { source, cause } => {
                write!(f, "source file `{}` is unreadable: {cause}", source.display())
            }
            Self::DestinationUnwritable { dir, cause } => write!(
                f,
                "storage directory `{}` cannot be created: {cause}",
                dir.display()
            ),
            Self::CopyFailed { destination, cause } => {
                write!(f, "copy to `{}` failed: {cause}", destination.display())
            }
        }
    }
}

impl Error for IngestionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SourceUnreadable { cause, .. }
            | Self::DestinationUnwritable { cause, .. }
            | Self::CopyFailed { cause, .. } => Some(cause),
        }
    }
}

/// Copies picked files into one managed directory.
#[derive(Debug, Clone)]
pub struct FileIngestionService {
    storage_dir: PathBuf,
}

impl FileIngestionService {
    /// The directory is created lazily on first ingestion.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Copies `file` into managed storage under a name derived from `now`.
    ///
    /// # Errors
    /// - `SourceUnreadable` when the source cannot be opened or inspected.
    /// - `DestinationUnwritable` when the storage directory cannot be created.
    /// - `CopyFailed` when writing, syncing, length verification or the final
    ///   rename fails. The temporary file is removed in that case.
    pub fn ingest(
        &self,
        file: &PickedFile,
        now: DateTime<Utc>,
    ) -> Result<IngestedFile, IngestionError> {
        let mut source = File::open(&file.source).map_err(|cause| {
            warn!("event=ingest module=ingest status=error error_code=source_unreadable");
            IngestionError::SourceUnreadable {
                source: file.source.clone(),
                cause,
            }
        })?;
        let metadata = source
            .metadata()
            .map_err(|cause| IngestionError::SourceUnreadable {
                source: file.source.clone(),
                cause,
            })?;
        if !metadata.is_file() {
            return Err(IngestionError::SourceUnreadable {
                source: file.source.clone(),
                cause: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }
        let expected_len = metadata.len();

        fs::create_dir_all(&self.storage_dir).map_err(|cause| {
            error!("event=ingest module=ingest status=error error_code=destination_unwritable");
            IngestionError::DestinationUnwritable {
                dir: self.storage_dir.clone(),
                cause,
            }
        })?;

        let base_name = format!("{}-{}", now.timestamp_millis(), sanitize_file_name(&file.name));
        let (final_path, stored_name) = self.reserve_final_path(&base_name)?;
        let partial_path = self
            .storage_dir
            .join(format!("{PARTIAL_PREFIX}{stored_name}{PARTIAL_SUFFIX}"));

        let copied = copy_into_partial(&mut source, &partial_path, expected_len)
            .and_then(|copied| {
                if final_path.exists() {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "destination appeared during copy",
                    ));
                }
                fs::rename(&partial_path, &final_path)?;
                Ok(copied)
            });

        let file_size = match copied {
            Ok(copied) => copied,
            Err(cause) => {
                let _ = fs::remove_file(&partial_path);
                error!(
                    "event=ingest module=ingest status=error error_code=copy_failed error={}",
                    cause
                );
                return Err(IngestionError::CopyFailed {
                    destination: final_path,
                    cause,
                });
            }
        };
        sync_dir(&self.storage_dir);

        info!(
            "event=ingest module=ingest status=ok bytes={}",
            file_size
        );
        Ok(IngestedFile {
            uri: final_path.to_string_lossy().into_owned(),
            file_size,
            stored_name,
        })
    }

    /// Removes `.partial` leftovers of interrupted ingestions.
    ///
    /// Returns how many files were removed. A missing directory counts as
    /// nothing to sweep.
    pub fn sweep_partials(&self) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!("event=ingest_sweep module=ingest status=ok removed={removed}");
        }
        Ok(removed)
    }

    fn reserve_final_path(&self, base_name: &str) -> Result<(PathBuf, String), IngestionError> {
        let (stem, extension) = split_extension(base_name);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                base_name.to_string()
            } else {
                format!("{stem}-{attempt}{extension}")
            };
            let path = self.storage_dir.join(&candidate);
            if !path.exists() {
                return Ok((path, candidate));
            }
        }
        Err(IngestionError::CopyFailed {
            destination: self.storage_dir.join(base_name),
            cause: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "no free destination name",
            ),
        })
    }
}

fn copy_into_partial(source: &mut File, partial: &Path, expected_len: u64) -> io::Result<u64> {
    let mut dest = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(partial)?;
    let copied = io::copy(source, &mut dest)?;
    dest.flush()?;
    dest.sync_all()?;
    if copied != expected_len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("copied {copied} of {expected_len} bytes"),
        ));
    }
    Ok(copied)
}

fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

/// Reduces a picked name to a safe single path component.
fn sanitize_file_name(name: &str) -> String {
    let last_component = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = UNSAFE_NAME_CHARS.replace_all(last_component, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_file_name, split_extension};

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name("calc.pdf"), "calc.pdf");
    }

    #[test]
    fn sanitize_strips_directories_and_unsafe_characters() {
        assert_eq!(sanitize_file_name("../../etc/My Notes (v2).pdf"), "My_Notes_v2_.pdf");
        assert_eq!(sanitize_file_name("C:\\tmp\\a b.pdf"), "a_b.pdf");
    }

    #[test]
    fn sanitize_falls_back_for_empty_or_hidden_names() {
        assert_eq!(sanitize_file_name("  "), "document");
        assert_eq!(sanitize_file_name("..."), "document");
        assert_eq!(sanitize_file_name(".hidden.pdf"), "hidden.pdf");
    }

    #[test]
    fn split_extension_handles_missing_extension() {
        assert_eq!(split_extension("1-calc.pdf"), ("1-calc", ".pdf"));
        assert_eq!(split_extension("1-notes"), ("1-notes", ""));
    }
}

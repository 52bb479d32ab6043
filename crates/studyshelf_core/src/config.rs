//! Catalog location configuration.
//!
//! # Responsibility
//! - Derive database, managed storage and blob key locations from one app
//!   data directory.
//!
//! # Invariants
//! - `data_dir` is a non-empty absolute path.

use crate::persistence::DEFAULT_STORAGE_KEY;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable consulted by `CatalogConfig::from_env`.
pub const DATA_DIR_ENV: &str = "STUDYSHELF_DATA_DIR";
const DEFAULT_DB_FILE_NAME: &str = "studyshelf.sqlite3";
const DEFAULT_STORAGE_SUBDIR: &str = "pdfs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDataDir,
    RelativeDataDir(PathBuf),
    MissingEnv(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDataDir => write!(f, "data_dir cannot be empty"),
            Self::RelativeDataDir(path) => write!(
                f,
                "data_dir must be an absolute path, got `{}`",
                path.display()
            ),
            Self::MissingEnv(name) => write!(f, "environment variable `{name}` is not set"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved storage layout for one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub data_dir: PathBuf,
    pub db_file_name: String,
    /// Managed directory for ingested files, relative to `data_dir`.
    pub storage_subdir: String,
    /// Key the catalog blob is stored under.
    pub storage_key: String,
}

impl CatalogConfig {
    /// Builds the default layout rooted at `data_dir`.
    ///
    /// # Errors
    /// - `EmptyDataDir` / `RelativeDataDir` for unusable roots.
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = data_dir.as_ref();
        let trimmed = raw.to_string_lossy();
        let trimmed = trimmed.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }
        let path = PathBuf::from(trimmed);
        if !path.is_absolute() {
            return Err(ConfigError::RelativeDataDir(path));
        }

        Ok(Self {
            data_dir: path,
            db_file_name: DEFAULT_DB_FILE_NAME.to_string(),
            storage_subdir: DEFAULT_STORAGE_SUBDIR.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        })
    }

    /// Reads the data directory from `STUDYSHELF_DATA_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(DATA_DIR_ENV).map_err(|_| ConfigError::MissingEnv(DATA_DIR_ENV))?;
        Self::from_data_dir(raw)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join(&self.storage_subdir)
    }
}

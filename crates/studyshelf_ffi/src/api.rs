//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the study material catalog to Dart via FRB.
//! - Own the single process-wide catalog instance.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - All catalog calls are serialized through one mutex.
//! - Timestamps cross the boundary as epoch milliseconds.

use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use studyshelf_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_app_catalog,
    ping as ping_inner, AppCatalog, CatalogConfig, CatalogError, Material, MaterialId,
    MaterialQuery, PickedFile,
};

const DEFAULT_DATA_DIR_NAME: &str = "studyshelf";
static CATALOG: OnceLock<Mutex<Option<AppCatalog>>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Catalog entry as seen by Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialItem {
    pub id: String,
    pub title: String,
    /// `note|pdf|link`.
    pub kind: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_at_ms: i64,
    pub last_accessed_ms: Option<i64>,
    pub is_favorite: bool,
    pub uri: Option<String>,
    pub file_size: Option<u64>,
}

/// Response envelope for single-entry catalog actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogActionResponse {
    pub ok: bool,
    /// Updated or created entry on success.
    pub item: Option<MaterialItem>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
    /// Set when memory is ahead of disk; the UI may offer `catalog_flush`.
    pub unsynced: bool,
}

impl CatalogActionResponse {
    fn success(message: impl Into<String>, material: Material) -> Self {
        Self {
            ok: true,
            item: Some(to_material_item(material)),
            message: message.into(),
            unsynced: false,
        }
    }

    fn failure(message: impl Into<String>, unsynced: bool) -> Self {
        Self {
            ok: false,
            item: None,
            message: message.into(),
            unsynced,
        }
    }
}

/// Response envelope for list/search calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogListResponse {
    pub items: Vec<MaterialItem>,
    pub message: String,
}

/// Opens the catalog rooted at `data_dir`, replacing any open instance.
///
/// # FFI contract
/// - Returns empty string on success and error message on failure.
/// - An open catalog with unsynced changes is flushed first; if that fails
///   it stays open and the call fails.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_init(data_dir: String) -> String {
    let config = match CatalogConfig::from_data_dir(data_dir.trim()) {
        Ok(config) => config,
        Err(err) => return format!("catalog_init failed: {err}"),
    };
    let catalog = match open_app_catalog(&config) {
        Ok(catalog) => catalog,
        Err(err) => return format!("catalog_init failed: {err}"),
    };
    let result = lock_catalog().and_then(|mut slot| install_catalog(&mut slot, catalog));
    match result {
        Ok(()) => String::new(),
        Err(err) => format!("catalog_init failed: {err}"),
    }
}

/// Creates a note entry.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_add_note(title: String, content: String) -> CatalogActionResponse {
    action("catalog_add_note", "Note created.", |catalog| {
        catalog.add_note(title, content)
    })
}

/// Ingests a file the Dart-side picker returned.
///
/// Dart handles picker cancellation itself and never calls this for it.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_add_pdf(name: String, source_path: String) -> CatalogActionResponse {
    let picked = PickedFile::new(name, PathBuf::from(source_path));
    action("catalog_add_pdf", "PDF added.", |catalog| {
        catalog.add_picked_pdf(&picked)
    })
}

/// Flips the favourite flag of one entry.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_toggle_favorite(id: String) -> CatalogActionResponse {
    with_parsed_id("catalog_toggle_favorite", &id, |material_id| {
        action("catalog_toggle_favorite", "Favorite updated.", |catalog| {
            catalog.toggle_favorite(&material_id)
        })
    })
}

/// Records that the entry was opened in the external viewer.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_record_access(id: String) -> CatalogActionResponse {
    with_parsed_id("catalog_record_access", &id, |material_id| {
        action("catalog_record_access", "Access recorded.", |catalog| {
            catalog.record_access(&material_id)
        })
    })
}

/// Replaces the tag list of one entry.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_set_tags(id: String, tags: Vec<String>) -> CatalogActionResponse {
    with_parsed_id("catalog_set_tags", &id, |material_id| {
        action("catalog_set_tags", "Tags updated.", |catalog| {
            catalog.set_tags(&material_id, tags)
        })
    })
}

/// Retries the durable write after a failed write-through.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_flush() -> String {
    let mut slot = match lock_catalog() {
        Ok(slot) => slot,
        Err(err) => return format!("catalog_flush failed: {err}"),
    };
    match slot.as_mut() {
        Some(catalog) => match catalog.flush() {
            Ok(()) => String::new(),
            Err(err) => format!("catalog_flush failed: {err}"),
        },
        None => "catalog_flush failed: catalog is not initialized".to_string(),
    }
}

/// Filters entries; empty arguments impose no restriction.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_search(
    text: Option<String>,
    tags: Vec<String>,
    favorites_only: bool,
) -> CatalogListResponse {
    let query = MaterialQuery {
        text,
        tags,
        favorites_only,
        ..MaterialQuery::default()
    };
    read("catalog_search", |catalog| catalog.search(&query))
}

/// Lists all entries, newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn catalog_list() -> CatalogListResponse {
    read("catalog_list", |catalog| catalog.list())
}

fn action(
    op: &str,
    success_message: &str,
    f: impl FnOnce(&mut AppCatalog) -> Result<Material, CatalogError>,
) -> CatalogActionResponse {
    let mut slot = match catalog_slot() {
        Ok(slot) => slot,
        Err(err) => return CatalogActionResponse::failure(format!("{op} failed: {err}"), false),
    };
    let Some(catalog) = slot.as_mut() else {
        return CatalogActionResponse::failure(format!("{op} failed: catalog unavailable"), false);
    };

    match f(catalog) {
        Ok(material) => CatalogActionResponse::success(success_message, material),
        Err(err) => {
            let unsynced = catalog.is_dirty();
            if unsynced {
                warn!("event=ffi_action module=ffi status=error op={op} dirty=true");
            }
            CatalogActionResponse::failure(format!("{op} failed: {err}"), unsynced)
        }
    }
}

fn read(op: &str, f: impl FnOnce(&AppCatalog) -> Vec<Material>) -> CatalogListResponse {
    let slot = match catalog_slot() {
        Ok(slot) => slot,
        Err(err) => {
            return CatalogListResponse {
                items: Vec::new(),
                message: format!("{op} failed: {err}"),
            }
        }
    };
    let Some(catalog) = slot.as_ref() else {
        return CatalogListResponse {
            items: Vec::new(),
            message: format!("{op} failed: catalog unavailable"),
        };
    };

    let items = f(catalog)
        .into_iter()
        .map(to_material_item)
        .collect::<Vec<_>>();
    let message = if items.is_empty() {
        "No materials.".to_string()
    } else {
        format!("Found {} material(s).", items.len())
    };
    CatalogListResponse { items, message }
}

fn with_parsed_id(
    op: &str,
    raw: &str,
    f: impl FnOnce(MaterialId) -> CatalogActionResponse,
) -> CatalogActionResponse {
    match MaterialId::parse(raw) {
        Ok(id) => f(id),
        Err(_) => CatalogActionResponse::failure(format!("{op} failed: invalid id `{raw}`"), false),
    }
}

fn install_catalog(slot: &mut Option<AppCatalog>, next: AppCatalog) -> Result<(), String> {
    if let Some(current) = slot.as_mut() {
        if current.is_dirty() {
            current.flush().map_err(|err| {
                warn!("event=ffi_catalog_init module=ffi status=error dirty=true");
                format!("unsynced changes could not be saved: {err}")
            })?;
        }
    }
    *slot = Some(next);
    Ok(())
}

fn lock_catalog() -> Result<MutexGuard<'static, Option<AppCatalog>>, String> {
    CATALOG
        .get_or_init(|| Mutex::new(None))
        .lock()
        .map_err(|_| "catalog mutex poisoned".to_string())
}

/// Locks the catalog, lazily opening the default location on first use.
fn catalog_slot() -> Result<MutexGuard<'static, Option<AppCatalog>>, String> {
    let mut slot = lock_catalog()?;
    if slot.is_none() {
        let config = CatalogConfig::from_env()
            .or_else(|_| CatalogConfig::from_data_dir(default_data_dir()))
            .map_err(|err| err.to_string())?;
        *slot = Some(open_app_catalog(&config).map_err(|err| err.to_string())?);
    }
    Ok(slot)
}

fn default_data_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME)
}

fn to_material_item(material: Material) -> MaterialItem {
    MaterialItem {
        id: material.id.to_string(),
        title: material.title,
        kind: material.kind.as_str().to_string(),
        description: material.description,
        tags: material.tags,
        created_at_ms: material.created_at.timestamp_millis(),
        last_accessed_ms: material.last_accessed.map(|at| at.timestamp_millis()),
        is_favorite: material.is_favorite,
        uri: material.uri,
        file_size: material.file_size,
    }
}

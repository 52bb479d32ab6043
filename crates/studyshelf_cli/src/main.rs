//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `studyshelf_core` linkage.
//! - Print a catalog summary when given a data directory.
//!
//! Usage: `studyshelf_cli [DATA_DIR]`. Falls back to `STUDYSHELF_DATA_DIR`.

use std::process::ExitCode;
use studyshelf_core::{
    open_app_catalog, CatalogConfig, MaterialKind, MaterialOrder, MaterialQuery,
};

fn main() -> ExitCode {
    println!("studyshelf_core ping={}", studyshelf_core::ping());
    println!("studyshelf_core version={}", studyshelf_core::core_version());

    let config = match std::env::args().nth(1) {
        Some(dir) => CatalogConfig::from_data_dir(dir),
        None => match CatalogConfig::from_env() {
            Ok(config) => Ok(config),
            // No catalog requested.
            Err(_) => return ExitCode::SUCCESS,
        },
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid data dir: {err}");
            return ExitCode::FAILURE;
        }
    };

    let catalog = match open_app_catalog(&config) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("failed to open catalog: {err}");
            return ExitCode::FAILURE;
        }
    };

    let materials = catalog.list();
    let count = |kind: MaterialKind| materials.iter().filter(|m| m.kind == kind).count();
    let favorites = materials.iter().filter(|m| m.is_favorite).count();
    println!("catalog data_dir={}", config.data_dir.display());
    println!(
        "catalog total={} notes={} pdfs={} links={} favorites={}",
        materials.len(),
        count(MaterialKind::Note),
        count(MaterialKind::Pdf),
        count(MaterialKind::Link),
        favorites
    );
    let recent_first = MaterialQuery::default().ordered_by(MaterialOrder::RecentlyAccessed);
    let recent = catalog.search(&recent_first);
    for material in recent.iter().take(5) {
        let stamp = material.last_accessed.unwrap_or(material.created_at);
        println!(
            "  {} [{}] {}",
            stamp.to_rfc3339(),
            material.kind.as_str(),
            material.title
        );
    }
    ExitCode::SUCCESS
}

//! Recipe dump import
//!
//! Reads JSON recipe dumps (an object keyed by recipe name, as written by
//! recipe-lister style mods) from a file or a directory tree and stores the
//! raw records in the database.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::RecipeRecord;
use crate::store;

/// Find every `*.json` dump under `path`, in a stable order
pub fn find_recipe_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        let file = entry.path();
        if entry.file_type().is_file() && file.extension().is_some_and(|ext| ext == "json") {
            files.push(file.to_path_buf());
        }
    }
    Ok(files)
}

/// Parse a dump, filling missing record names from their keys
pub fn parse_recipe_json(content: &str) -> serde_json::Result<BTreeMap<String, RecipeRecord>> {
    let mut records: BTreeMap<String, RecipeRecord> = serde_json::from_str(content)?;
    for (key, record) in records.iter_mut() {
        if record.name != *key {
            if !record.name.is_empty() {
                debug!(key = %key, name = %record.name, "record name differs from its key, using the key");
            }
            record.name = key.clone();
        }
    }
    Ok(records)
}

fn parse_recipe_file(path: &Path) -> Result<BTreeMap<String, RecipeRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_recipe_json(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Import all dumps under `path` into the database
///
/// Later files override recipes of the same name from earlier ones. A file
/// that fails to parse is reported and skipped.
pub fn import_to_database(conn: &Connection, path: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    info!("Scanning {} for recipe dumps...", path.display());
    let files = find_recipe_files(path)?;
    info!("Found {} recipe dump files", files.len());

    let mut merged: BTreeMap<String, RecipeRecord> = BTreeMap::new();
    for file in &files {
        match parse_recipe_file(file) {
            Ok(records) => {
                info!("  Parsed: {} ({} recipes)", file.display(), records.len());
                for (name, record) in records {
                    if merged.insert(name.clone(), record).is_some() {
                        warn!(recipe = %name, file = %file.display(), "recipe overridden by later file");
                        stats.overridden += 1;
                    }
                }
                stats.files += 1;
            }
            Err(e) => {
                warn!("  Error parsing {}: {:#}", file.display(), e);
                stats.errors += 1;
            }
        }
    }

    let tx = conn.unchecked_transaction()?;
    for record in merged.values() {
        store::upsert_record(&tx, record)?;
    }
    tx.commit()?;
    stats.recipes = merged.len();

    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub recipes: usize,
    pub overridden: usize,
    pub errors: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} recipes from {} files ({} overridden). Errors: {}",
            self.recipes, self.files, self.overridden, self.errors
        )
    }
}

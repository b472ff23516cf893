//! Record loading and saving
//!
//! Generic helpers over the YAML store so command implementations stay
//! short. Every record lives in its own file; the directory is chosen by the
//! record's id prefix.

use miette::{IntoDiagnostic, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::entity::Entity;
use crate::core::project::Project;
use crate::core::shortid::ShortIdIndex;

/// Load all entities of type T from a directory
///
/// Scans the directory for .yaml files and deserializes them.
/// Files that fail to parse are skipped with a warning.
pub fn load_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut entities = Vec::new();

    if !dir.exists() {
        return Ok(entities);
    }

    for entry in fs::read_dir(dir).into_diagnostic()? {
        let path = entry.into_diagnostic()?.path();

        if path.extension().is_some_and(|e| e == "yaml") {
            let content = fs::read_to_string(&path).into_diagnostic()?;
            match serde_yml::from_str::<T>(&content) {
                Ok(entity) => entities.push(entity),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    Ok(entities)
}

/// Load every record of one type from the project
pub fn load_records<T: Entity>(project: &Project) -> Result<Vec<T>> {
    load_all(&project.entity_dir(T::PREFIX))
}

/// Find an entity file by ID (supports partial matching)
///
/// Searches for a file whose stem contains the given ID.
/// Returns the first match found.
pub fn find_entity_file(dir: &Path, id: &str) -> Option<PathBuf> {
    if id.is_empty() {
        return None;
    }

    fs::read_dir(dir).ok()?.filter_map(|e| e.ok()).map(|e| e.path()).find(|path| {
        path.extension().is_some_and(|e| e == "yaml")
            && path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.contains(id))
    })
}

/// Load a single entity by ID
///
/// Searches for an entity file matching the ID and deserializes it.
/// Returns the path and entity if found.
pub fn load_entity<T: DeserializeOwned>(dir: &Path, id: &str) -> Result<Option<(PathBuf, T)>> {
    if let Some(path) = find_entity_file(dir, id) {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        let entity: T = serde_yml::from_str(&content).into_diagnostic()?;
        return Ok(Some((path, entity)));
    }
    Ok(None)
}

/// Resolve a user reference to a stored record.
///
/// Accepts a short ID (`RNC@2`), a record number (`RNC-0007`, case
/// insensitive) or a full or partial entity ID, tried in that order.
pub fn resolve<T: Entity>(project: &Project, reference: &str) -> Result<(PathBuf, T)> {
    let short_ids = ShortIdIndex::load(project);
    let resolved = short_ids
        .resolve(reference)
        .ok_or_else(|| miette::miette!("Unknown short ID '{}'. Run a list command first.", reference))?;

    let dir = project.entity_dir(T::PREFIX);

    for path in project.iter_entity_files(T::PREFIX) {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        if let Ok(entity) = serde_yml::from_str::<T>(&content) {
            if entity
                .number()
                .is_some_and(|n| n.eq_ignore_ascii_case(&resolved))
            {
                return Ok((path, entity));
            }
        }
    }

    load_entity(&dir, &resolved)?.ok_or_else(|| {
        miette::miette!("No {} found matching '{}'", T::PREFIX, reference)
    })
}

/// Write a record to its file, creating the directory if needed
pub fn save_entity<T: Entity>(project: &Project, entity: &T) -> Result<PathBuf> {
    let path = project.entity_path(entity.id());
    save_entity_at(&path, entity)?;
    Ok(path)
}

/// Write a record to an explicit path (used when updating a loaded record)
pub fn save_entity_at<T: Entity>(path: &Path, entity: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(entity).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()?;
    tracing::debug!("Wrote {} to {}", entity.display_ref(), path.display());
    Ok(())
}

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CatalogError;
use crate::mutants::{Mutation, MutationResult};

pub fn load_catalog(path: &Path) -> Result<Vec<Mutation>, CatalogError> {
    load_json(path)
}

pub fn save_catalog(path: &Path, mutations: &[Mutation]) -> Result<(), CatalogError> {
    save_json(path, &mutations)
}

pub fn find_mutation<'a>(catalog: &'a [Mutation], id: &str) -> Result<&'a Mutation, CatalogError> {
    catalog
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| CatalogError::UnknownMutation(id.to_string()))
}

pub fn load_result(path: &Path) -> Result<MutationResult, CatalogError> {
    load_json(path)
}

pub fn save_result(path: &Path, result: &MutationResult) -> Result<(), CatalogError> {
    save_json(path, result)
}

/// `<dir>/<id>.json`, with anything but `[A-Za-z0-9_-]` in the id replaced.
pub fn result_path(dir: &Path, mutation_id: &str) -> PathBuf {
    let name: String = mutation_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{name}.json"))
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-printed JSON, creating missing parent directories.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json + "\n").map_err(io_err)
}

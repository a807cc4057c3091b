//! Catalog loaders for data-driven game tables
//!
//! Operators can export the built-in tables to JSON, tune drop rates or rewards,
//! and point the config at the edited file without recompiling.

use std::fs;
use std::path::Path;

use log::info;

use crate::game::catalog::Catalog;
use crate::game::errors::GameError;

fn invalid_data(path: &Path, err: impl std::fmt::Display) -> GameError {
    GameError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("Failed to parse {}: {}", path.display(), err),
    ))
}

/// Load and validate a catalog from a JSON file.
pub fn load_catalog_from_json<P: AsRef<Path>>(path: P) -> Result<Catalog, GameError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let catalog: Catalog = serde_json::from_str(&contents).map_err(|e| invalid_data(path, e))?;
    catalog.validate()?;
    info!(
        "loaded catalog from {} ({} locations, {} bosses, {} recipes)",
        path.display(),
        catalog.locations.len(),
        catalog.bosses.len(),
        catalog.recipes.len()
    );
    Ok(catalog)
}

/// Write a catalog as pretty JSON, creating parent directories as needed.
pub fn save_catalog_to_json<P: AsRef<Path>>(catalog: &Catalog, path: P) -> Result<(), GameError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(catalog).map_err(|e| invalid_data(path, e))?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn exported_catalog_loads_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("seeds").join("catalog.json");
        save_catalog_to_json(&Catalog::standard(), &path).expect("save");
        let loaded = load_catalog_from_json(&path).expect("load");
        assert_eq!(loaded, Catalog::standard());
    }

    #[test]
    fn malformed_json_is_invalid_data() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{ not json").expect("write");
        match load_catalog_from_json(&path) {
            Err(GameError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GnpsError;

/// One manifest row: a logical sample name and the local feature file it
/// was measured from.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRow {
    pub sample_name: String,
    pub filepath: String,
}

/// Parsed sample manifest. Rows keep file order; the derived maps follow
/// last-write-wins on key collisions, matching that order.
#[derive(Debug, Clone)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, GnpsError> {
        let mut reader =
            csv::Reader::from_path(path).map_err(|_| GnpsError::ManifestRead(path.to_path_buf()))?;
        let mut rows = Vec::new();
        for row in reader.deserialize::<ManifestRow>() {
            rows.push(row.map_err(|err| GnpsError::ManifestParse(err.to_string()))?);
        }
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<ManifestRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub fn filepaths(&self) -> Vec<PathBuf> {
        self.rows.iter().map(|row| PathBuf::from(&row.filepath)).collect()
    }

    /// Fails fast with the first missing path before any remote interaction.
    pub fn verify_files_exist(&self) -> Result<(), GnpsError> {
        for row in &self.rows {
            let path = Path::new(&row.filepath);
            if !path.exists() {
                return Err(GnpsError::InputNotFound(path.to_path_buf()));
            }
        }
        Ok(())
    }

    /// Map keyed by file basename without extension. This is the key space
    /// of cluster bucket table columns.
    pub fn stem_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for row in &self.rows {
            if let Some(stem) = Path::new(&row.filepath).file_stem() {
                map.insert(stem.to_string_lossy().into_owned(), row.sample_name.clone());
            }
        }
        map
    }

    /// Map keyed by raw file basename, extension included. This is the key
    /// space of MZmine "Peak area" column labels, which is deliberately not
    /// the same as `stem_map`.
    pub fn basename_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for row in &self.rows {
            if let Some(name) = Path::new(&row.filepath).file_name() {
                map.insert(name.to_string_lossy().into_owned(), row.sample_name.clone());
            }
        }
        map
    }
}

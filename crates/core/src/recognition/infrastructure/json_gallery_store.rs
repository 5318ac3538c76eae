use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::recognition::domain::gallery_error::GalleryError;
use crate::recognition::domain::gallery_index::GalleryIndex;
use crate::recognition::domain::gallery_store::GalleryStore;

/// On-disk gallery layout: two positionally paired, equal-length sequences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub encodings: Vec<Vec<f64>>,
    pub names: Vec<String>,
}

/// Gallery persisted as JSON via `serde_json`.
///
/// Floats are written in shortest round-trip form and parsed with the
/// `float_roundtrip` feature, so `load(save(x)) == x` bit for bit.
pub struct JsonGalleryStore;

impl JsonGalleryStore {
    pub fn new() -> Self {
        Self
    }

    pub fn save(&self, path: &Path, record: &GalleryRecord) -> Result<(), GalleryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| GalleryError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_vec(record).map_err(|source| GalleryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| GalleryError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_record(&self, path: &Path) -> Result<GalleryRecord, GalleryError> {
        let bytes = fs::read(path).map_err(|source| GalleryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| GalleryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for JsonGalleryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GalleryStore for JsonGalleryStore {
    fn load(
        &self,
        path: &Path,
        expected_dimension: Option<usize>,
    ) -> Result<GalleryIndex, GalleryError> {
        let record = self.read_record(path)?;
        let index = GalleryIndex::from_parts(record.encodings, record.names, expected_dimension)?;
        log::info!(
            "Loaded {} gallery encodings from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_of(index: &GalleryIndex) -> GalleryRecord {
        let (encodings, names) = index
            .entries()
            .iter()
            .map(|e| (e.embedding().as_slice().to_vec(), e.label().to_string()))
            .unzip();
        GalleryRecord { encodings, names }
    }

    fn record() -> GalleryRecord {
        GalleryRecord {
            encodings: vec![
                vec![0.1, -0.2, 0.30000000000000004],
                vec![1e-300, 123456.789, -7.25],
                vec![0.0, 0.0, 0.0],
            ],
            names: vec!["alice".into(), "bob".into(), "alice".into()],
        }
    }

    #[test]
    fn test_save_then_read_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        let store = JsonGalleryStore::new();

        store.save(&path, &record()).unwrap();
        let loaded = store.read_record(&path).unwrap();

        assert_eq!(loaded, record());
        for (a, b) in loaded.encodings.iter().flatten().zip(record().encodings.iter().flatten()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_load_builds_index_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        let store = JsonGalleryStore::new();
        store.save(&path, &record()).unwrap();

        let index = store.load(&path, Some(3)).unwrap();

        assert_eq!(index.len(), 3);
        let labels: Vec<_> = index.entries().iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["alice", "bob", "alice"]);
        assert_eq!(record_of(&index), record());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonGalleryStore::new()
            .load(&dir.path().join("missing.json"), None)
            .unwrap_err();
        assert!(matches!(err, GalleryError::Read { .. }));
    }

    #[test]
    fn test_load_garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        fs::write(&path, b"\x80\x04not a gallery").unwrap();
        let err = JsonGalleryStore::new().load(&path, None).unwrap_err();
        assert!(matches!(err, GalleryError::Parse { .. }));
    }

    #[test]
    fn test_load_mismatched_lengths_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        fs::write(&path, r#"{"encodings": [[0.0], [1.0]], "names": ["alice"]}"#).unwrap();
        let err = JsonGalleryStore::new().load(&path, None).unwrap_err();
        assert!(matches!(
            err,
            GalleryError::LengthMismatch {
                encodings: 2,
                names: 1
            }
        ));
    }

    #[test]
    fn test_load_wrong_dimension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        fs::write(&path, r#"{"encodings": [[0.0, 1.0]], "names": ["alice"]}"#).unwrap();
        let err = JsonGalleryStore::new().load(&path, Some(512)).unwrap_err();
        assert!(matches!(err, GalleryError::Dimension { .. }));
    }

    #[test]
    fn test_load_missing_field_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        fs::write(&path, r#"{"encodings": []}"#).unwrap();
        let err = JsonGalleryStore::new().load(&path, None).unwrap_err();
        assert!(matches!(err, GalleryError::Parse { .. }));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gallery.json");
        JsonGalleryStore::new()
            .save(&path, &GalleryRecord::default())
            .unwrap();
        assert!(path.exists());
    }
}

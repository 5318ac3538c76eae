use std::path::PathBuf;

use thiserror::Error;

/// Why a gallery could not be loaded or saved.
#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("failed to read gallery {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write gallery {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed gallery {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("gallery has {encodings} encodings but {names} names")]
    LengthMismatch { encodings: usize, names: usize },
    #[error("gallery encoding {index} has {actual} dimensions, expected {expected}")]
    Dimension {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("gallery encoding {index} contains a non-finite value")]
    NonFinite { index: usize },
}

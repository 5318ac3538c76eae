use std::path::Path;

use super::gallery_error::GalleryError;
use super::gallery_index::GalleryIndex;

/// Loads the persisted gallery once at startup.
pub trait GalleryStore {
    /// Reads the gallery at `path`, rejecting it as corrupt if its encodings
    /// and names disagree in count or any encoding has the wrong length.
    fn load(
        &self,
        path: &Path,
        expected_dimension: Option<usize>,
    ) -> Result<GalleryIndex, GalleryError>;
}

use crate::recognition::domain::embedding::Embedding;
use crate::shared::bounding_box::{BoundingBox, WorkingSpace};
use crate::shared::frame::Frame;

/// Computes one embedding per face box.
///
/// The returned vector must have the same length and order as `boxes`.
pub trait EmbeddingExtractor: Send {
    fn extract(
        &mut self,
        frame: &Frame,
        boxes: &[BoundingBox<WorkingSpace>],
    ) -> Result<Vec<Embedding>, Box<dyn std::error::Error>>;

    /// Length of every embedding this extractor produces.
    fn dimension(&self) -> usize;

    /// Euclidean match tolerance the underlying model was calibrated for.
    fn default_tolerance(&self) -> f64;
}

use std::collections::HashMap;

use crate::shared::constants::UNKNOWN_LABEL;

use super::embedding::Embedding;
use super::gallery_index::GalleryIndex;

/// Assigns one label per face embedding by majority vote over the gallery.
///
/// Every gallery entry within `tolerance` casts one vote for its label, so
/// an identity with more reference embeddings gets proportionally more
/// votes. The label with the most votes wins.
///
/// Ties go to the label whose first matching entry comes earliest in gallery
/// order. This is deterministic but ignores how close the tied matches
/// actually are; a distance-aware tie-break would be stronger and is a known
/// weak point of this policy.
///
/// Stateless between calls: nothing is carried from one frame to the next.
pub struct IdentificationEngine {
    gallery: GalleryIndex,
    tolerance: f64,
}

impl IdentificationEngine {
    pub fn new(gallery: GalleryIndex, tolerance: f64) -> Self {
        Self { gallery, tolerance }
    }

    pub fn gallery(&self) -> &GalleryIndex {
        &self.gallery
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the winning label for `embedding`, or `"Unknown"` if no
    /// gallery entry is within tolerance.
    pub fn identify(&self, embedding: &Embedding) -> String {
        let mut votes: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();

        for entry in self.gallery.matching_entries(embedding, self.tolerance) {
            let count = votes.entry(entry.label()).or_insert_with(|| {
                first_seen.push(entry.label());
                0
            });
            *count += 1;
        }

        let mut winner: Option<(&str, usize)> = None;
        for label in first_seen {
            let count = votes.get(label).copied().unwrap_or(0);
            // Strictly greater keeps the earliest label on ties.
            if winner.map_or(true, |(_, best)| count > best) {
                winner = Some((label, count));
            }
        }

        winner
            .map(|(label, _)| label.to_string())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    /// Identifies each embedding; output order matches input order.
    pub fn identify_all(&self, embeddings: &[Embedding]) -> Vec<String> {
        embeddings.iter().map(|e| self.identify(e)).collect()
    }
}

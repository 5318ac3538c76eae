use super::embedding::Embedding;
use super::gallery_error::GalleryError;

/// One reference embedding and the identity it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct GalleryEntry {
    label: String,
    embedding: Embedding,
}

impl GalleryEntry {
    pub fn new(label: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            label: label.into(),
            embedding,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }
}

/// Immutable, ordered set of known identities.
///
/// Several entries may share a label (several reference images of one
/// person). Entry order is the load order and is significant: it decides
/// ties during identification.
#[derive(Clone, Debug, Default)]
pub struct GalleryIndex {
    entries: Vec<GalleryEntry>,
    dimension: Option<usize>,
}

impl GalleryIndex {
    /// Builds the index from parallel `encodings` / `names` sequences.
    ///
    /// All encodings must share one dimensionality. When
    /// `expected_dimension` is given (the embedding extractor's output size)
    /// every encoding must have exactly that many components.
    pub fn from_parts(
        encodings: Vec<Vec<f64>>,
        names: Vec<String>,
        expected_dimension: Option<usize>,
    ) -> Result<Self, GalleryError> {
        if encodings.len() != names.len() {
            return Err(GalleryError::LengthMismatch {
                encodings: encodings.len(),
                names: names.len(),
            });
        }

        let mut dimension = expected_dimension;
        let mut entries = Vec::with_capacity(encodings.len());
        for (index, (values, label)) in encodings.into_iter().zip(names).enumerate() {
            let expected = *dimension.get_or_insert(values.len());
            if values.len() != expected {
                return Err(GalleryError::Dimension {
                    index,
                    expected,
                    actual: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(GalleryError::NonFinite { index });
            }
            entries.push(GalleryEntry::new(label, Embedding::new(values)));
        }

        Ok(Self { entries, dimension })
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding length shared by every entry, if known.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Fails if the stored encodings do not have `expected` components.
    ///
    /// An empty gallery loaded without an expected dimension accepts any.
    pub fn check_dimension(&self, expected: usize) -> Result<(), GalleryError> {
        match self.dimension {
            Some(actual) if actual != expected => Err(GalleryError::Dimension {
                index: 0,
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Entries within `tolerance` (inclusive) of `embedding`, in gallery order.
    pub fn matching_entries<'a, 'q>(
        &'a self,
        embedding: &'q Embedding,
        tolerance: f64,
    ) -> impl Iterator<Item = &'a GalleryEntry> + 'q
    where
        'a: 'q,
    {
        self.entries
            .iter()
            .filter(move |entry| entry.embedding.distance(embedding) <= tolerance)
    }

    /// Distinct labels with at least one entry within `tolerance`.
    ///
    /// Labels appear once each, ordered by their first matching entry.
    pub fn candidates(&self, embedding: &Embedding, tolerance: f64) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for entry in self.matching_entries(embedding, tolerance) {
            if !labels.contains(&entry.label()) {
                labels.push(entry.label());
            }
        }
        labels
    }
}

use crate::shared::bounding_box::{BoundingBox, DisplaySpace};
use crate::shared::frame::Frame;

/// Offset between a face's top edge and the baseline of its label.
pub const LABEL_OFFSET: i32 = 15;

/// One identified face to draw on a display frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub face: BoundingBox<DisplaySpace>,
    pub label: String,
}

impl Annotation {
    pub fn new(face: BoundingBox<DisplaySpace>, label: impl Into<String>) -> Self {
        Self {
            face,
            label: label.into(),
        }
    }
}

/// Baseline row for a face's label: above the box when there is room,
/// otherwise just inside it.
pub fn label_baseline(top: i32) -> i32 {
    let above = top - LABEL_OFFSET;
    if above > LABEL_OFFSET {
        above
    } else {
        top + LABEL_OFFSET
    }
}

/// Draws face boxes and their labels onto a frame in place.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        annotations: &[Annotation],
    ) -> Result<(), Box<dyn std::error::Error>>;
}

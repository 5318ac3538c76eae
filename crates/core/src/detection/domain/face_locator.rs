use crate::shared::bounding_box::{BoundingBox, WorkingSpace};
use crate::shared::frame::Frame;

/// Finds faces in a working-resolution frame.
///
/// Implementations may keep inference sessions or scratch buffers across
/// calls, hence `&mut self`. An empty result is the normal "no faces" case.
pub trait FaceLocator: Send {
    fn locate(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<BoundingBox<WorkingSpace>>, Box<dyn std::error::Error>>;
}

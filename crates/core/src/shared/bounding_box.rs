use std::fmt;
use std::marker::PhantomData;

/// Coordinate space of the downscaled frame the face locator runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkingSpace;

/// Coordinate space of the native-resolution frame that is rendered and recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplaySpace;

/// Face rectangle as `(top, right, bottom, left)` pixel coordinates.
///
/// The type parameter records which frame the coordinates belong to, so a
/// working-space box cannot be drawn on a display frame without going
/// through [`FrameGeometry::rescale`](crate::recognition::domain::frame_geometry::FrameGeometry::rescale).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox<S> {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
    space: PhantomData<S>,
}

impl<S> BoundingBox<S> {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
            space: PhantomData,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Clips the box to a `frame_w x frame_h` frame.
    ///
    /// Returns `None` when nothing of the box remains inside the frame.
    pub fn clamp(&self, frame_w: u32, frame_h: u32) -> Option<Self> {
        let top = self.top.clamp(0, frame_h as i32);
        let bottom = self.bottom.clamp(0, frame_h as i32);
        let left = self.left.clamp(0, frame_w as i32);
        let right = self.right.clamp(0, frame_w as i32);
        if bottom <= top || right <= left {
            return None;
        }
        Some(Self::new(top, right, bottom, left))
    }
}

impl<S> fmt::Debug for BoundingBox<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox(top={}, right={}, bottom={}, left={})",
            self.top, self.right, self.bottom, self.left
        )
    }
}

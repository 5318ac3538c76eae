use crate::shared::frame::Frame;

/// A key observed while polling the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPress {
    /// The designated cancellation key.
    Escape,
    Other,
}

/// Interactive window presenting annotated frames.
///
/// Not `Send`: windowing backends are bound to the thread that created them.
pub trait FrameDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Waits briefly for input and returns the key pressed since the last
    /// poll, if any.
    fn poll_key(&mut self) -> Option<KeyPress>;

    /// `false` once the operator has closed the window.
    fn is_open(&self) -> bool;

    fn close(&mut self);
}

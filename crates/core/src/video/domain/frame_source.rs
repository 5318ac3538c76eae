use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Pull-based source of successive frames: a camera or a video file.
///
/// `next_frame` blocks until a frame is available. A live device may drop
/// frames on its own when the consumer is slow; nothing is buffered here.
pub trait FrameSource: Send {
    /// Opens a capture device or a video file/URL and returns its metadata.
    fn open(&mut self, source: &str) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns the next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the underlying device or file. Safe to call more than once.
    fn close(&mut self);
}

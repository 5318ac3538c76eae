use thiserror::Error;

use crate::recognition::domain::gallery_error::GalleryError;
use crate::video::domain::output_sink::OutputSinkError;

/// Failures that stop a recognition run, at startup or inside the loop.
///
/// Per-frame localization and embedding failures are not represented here:
/// the frame loop absorbs them as "no faces" for that frame.
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("corrupt gallery: {0}")]
    CorruptGallery(#[from] GalleryError),
    #[error("frame source failed: {0}")]
    FrameSource(String),
    #[error("output sink failed: {0}")]
    OutputSink(String),
    #[error("display failed: {0}")]
    Display(String),
    #[error("frame loop has already run")]
    AlreadyRun,
}

impl RecognitionError {
    /// Folds a failure hit while releasing resources into the error that
    /// ended the run, keeping the original variant.
    pub fn with_release_failure(self, release: RecognitionError) -> Self {
        let note = |message: String| format!("{message}; then while releasing: {release}");
        match self {
            Self::Configuration(m) => Self::Configuration(note(m)),
            Self::FrameSource(m) => Self::FrameSource(note(m)),
            Self::OutputSink(m) => Self::OutputSink(note(m)),
            Self::Display(m) => Self::Display(note(m)),
            other => {
                log::error!("{release}");
                other
            }
        }
    }
}

impl From<OutputSinkError> for RecognitionError {
    fn from(e: OutputSinkError) -> Self {
        RecognitionError::OutputSink(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_error_converts_to_corrupt_gallery() {
        let err: RecognitionError = GalleryError::LengthMismatch {
            encodings: 2,
            names: 1,
        }
        .into();
        assert!(matches!(err, RecognitionError::CorruptGallery(_)));
        assert_eq!(
            err.to_string(),
            "corrupt gallery: gallery has 2 encodings but 1 names"
        );
    }

    #[test]
    fn test_release_failure_is_appended_to_run_error() {
        let err = RecognitionError::FrameSource("camera unplugged".to_string())
            .with_release_failure(RecognitionError::OutputSink("disk full".to_string()));
        assert!(matches!(err, RecognitionError::FrameSource(_)));
        assert_eq!(
            err.to_string(),
            "frame source failed: camera unplugged; then while releasing: output sink failed: disk full"
        );
    }

    #[test]
    fn test_release_failure_keeps_variant_without_message() {
        let err = RecognitionError::AlreadyRun
            .with_release_failure(RecognitionError::OutputSink("disk full".to_string()));
        assert!(matches!(err, RecognitionError::AlreadyRun));
    }

    #[test]
    fn test_sink_error_keeps_message() {
        let err: RecognitionError = OutputSinkError::Finished.into();
        assert_eq!(err.to_string(), "output sink failed: output sink already finished");
    }
}

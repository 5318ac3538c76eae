use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

use super::video_writer::VideoWriter;

#[derive(Error, Debug)]
pub enum OutputSinkError {
    #[error("cannot open output video {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("frame {index} is {actual_w}x{actual_h}, output was opened at {expected_w}x{expected_h}")]
    FrameSize {
        index: usize,
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },
    #[error("cannot write frame {index}: {message}")]
    Write { index: usize, message: String },
    #[error("cannot finalize output video {path}: {message}")]
    Close { path: PathBuf, message: String },
    #[error("output sink already finished")]
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SinkState {
    Pending,
    Open { width: u32, height: u32 },
    Finished,
}

/// Recording sink that owns a [`VideoWriter`] for the whole run.
///
/// The writer is opened lazily by the first frame, whose dimensions become
/// the fixed frame size of the output. A later frame of any other size is
/// rejected and never reaches the writer. `finish` closes the writer even
/// after failed writes so frames already accepted are flushed to disk.
pub struct OutputSink {
    writer: Box<dyn VideoWriter>,
    path: PathBuf,
    fps: f64,
    state: SinkState,
    frames_written: usize,
}

impl OutputSink {
    pub fn new(writer: Box<dyn VideoWriter>, path: impl Into<PathBuf>, fps: f64) -> Self {
        Self {
            writer,
            path: path.into(),
            fps,
            state: SinkState::Pending,
            frames_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frame size fixed by the first written frame.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        match self.state {
            SinkState::Open { width, height } => Some((width, height)),
            _ => None,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open { .. })
    }

    pub fn write(&mut self, frame: &Frame) -> Result<(), OutputSinkError> {
        let (width, height) = match self.state {
            SinkState::Finished => return Err(OutputSinkError::Finished),
            SinkState::Pending => self.open(frame.width(), frame.height())?,
            SinkState::Open { width, height } => (width, height),
        };

        if frame.width() != width || frame.height() != height {
            return Err(OutputSinkError::FrameSize {
                index: frame.index(),
                expected_w: width,
                expected_h: height,
                actual_w: frame.width(),
                actual_h: frame.height(),
            });
        }

        self.writer
            .write(frame)
            .map_err(|e| OutputSinkError::Write {
                index: frame.index(),
                message: e.to_string(),
            })?;
        self.frames_written += 1;
        Ok(())
    }

    /// Flushes and closes the writer. Later calls are no-ops.
    pub fn finish(&mut self) -> Result<(), OutputSinkError> {
        let was_open = self.is_open();
        self.state = SinkState::Finished;
        if !was_open {
            return Ok(());
        }
        self.writer.close().map_err(|e| OutputSinkError::Close {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        log::info!(
            "Wrote {} frames to {}",
            self.frames_written,
            self.path.display()
        );
        Ok(())
    }

    fn open(&mut self, width: u32, height: u32) -> Result<(u32, u32), OutputSinkError> {
        let metadata = VideoMetadata::new(width, height, self.fps);
        self.writer
            .open(&self.path, &metadata)
            .map_err(|e| OutputSinkError::Open {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        log::info!(
            "Recording {width}x{height} at {} fps to {}",
            self.fps,
            self.path.display()
        );
        self.state = SinkState::Open { width, height };
        Ok((width, height))
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("{e}");
        }
    }
}

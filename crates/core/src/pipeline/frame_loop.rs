use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::annotation::domain::frame_annotator::{Annotation, FrameAnnotator};
use crate::detection::domain::embedding_extractor::EmbeddingExtractor;
use crate::detection::domain::face_locator::FaceLocator;
use crate::recognition::domain::frame_geometry::FrameGeometry;
use crate::recognition::domain::identification_engine::IdentificationEngine;
use crate::shared::bounding_box::{BoundingBox, WorkingSpace};
use crate::shared::constants::DEFAULT_WORKING_WIDTH;
use crate::shared::frame::Frame;
use crate::video::domain::frame_display::{FrameDisplay, KeyPress};
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::output_sink::OutputSink;

use super::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, METRIC_FACES, STAGE_CAPTURE, STAGE_DETECT, STAGE_EMBED,
    STAGE_IDENTIFY, STAGE_RENDER, STAGE_WRITE,
};
use super::recognition_config::SinkErrorPolicy;
use super::recognition_error::RecognitionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, not yet run.
    Ready,
    Running,
    Stopping,
    /// Terminal: every resource has been released.
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    CancelKey,
    WindowClosed,
    Terminated,
    EndOfStream,
}

/// Result of a completed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: usize,
    pub stop_reason: StopReason,
}

/// Decides whether the loop stops after the current frame.
///
/// An external termination request wins over the cancel key, which wins
/// over a window the operator closed.
pub fn stop_reason(
    key: Option<KeyPress>,
    window_open: bool,
    terminate_requested: bool,
) -> Option<StopReason> {
    if terminate_requested {
        Some(StopReason::Terminated)
    } else if key == Some(KeyPress::Escape) {
        Some(StopReason::CancelKey)
    } else if !window_open {
        Some(StopReason::WindowClosed)
    } else {
        None
    }
}

/// Per-frame identification loop over an opened frame source.
///
/// Each frame is converted to RGB, mirrored, and downscaled to the working
/// width for localization and embedding. Boxes are rescaled to the
/// mirrored native frame, which is annotated, recorded and shown. One frame
/// is fully processed before the next is requested.
///
/// A failure to locate or embed faces on a frame is logged and treated as
/// zero faces for that frame. Frame source and display failures end the
/// run; output sink failures end it or disable recording, depending on the
/// configured [`SinkErrorPolicy`].
///
/// The frame source, display and output sink are released on every exit
/// path, and again on drop if `run` was never called. A loop runs once.
pub struct FrameLoop {
    source: Box<dyn FrameSource>,
    locator: Box<dyn FaceLocator>,
    extractor: Box<dyn EmbeddingExtractor>,
    engine: IdentificationEngine,
    annotator: Box<dyn FrameAnnotator>,
    sink: Option<OutputSink>,
    sink_policy: SinkErrorPolicy,
    display: Option<Box<dyn FrameDisplay>>,
    logger: Box<dyn PipelineLogger>,
    terminate: Arc<AtomicBool>,
    working_width: u32,
    state: LoopState,
}

impl FrameLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        locator: Box<dyn FaceLocator>,
        extractor: Box<dyn EmbeddingExtractor>,
        engine: IdentificationEngine,
        annotator: Box<dyn FrameAnnotator>,
    ) -> Self {
        Self {
            source,
            locator,
            extractor,
            engine,
            annotator,
            sink: None,
            sink_policy: SinkErrorPolicy::default(),
            display: None,
            logger: Box::new(NullPipelineLogger),
            terminate: Arc::new(AtomicBool::new(false)),
            working_width: DEFAULT_WORKING_WIDTH,
            state: LoopState::Ready,
        }
    }

    pub fn with_sink(mut self, sink: OutputSink, policy: SinkErrorPolicy) -> Self {
        self.sink = Some(sink);
        self.sink_policy = policy;
        self
    }

    pub fn with_display(mut self, display: Box<dyn FrameDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Flag set from outside (e.g. a signal handler) to request a stop.
    pub fn with_terminate_flag(mut self, terminate: Arc<AtomicBool>) -> Self {
        self.terminate = terminate;
        self
    }

    pub fn with_working_width(mut self, working_width: u32) -> Self {
        self.working_width = working_width.max(1);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Processes frames until cancelled or the stream ends, then releases
    /// every resource.
    pub fn run(&mut self) -> Result<RunSummary, RecognitionError> {
        if self.state != LoopState::Ready {
            return Err(RecognitionError::AlreadyRun);
        }
        self.state = LoopState::Running;
        self.logger.info(&format!(
            "Frame loop running (working width {}, gallery of {} entries, tolerance {})",
            self.working_width,
            self.engine.gallery().len(),
            self.engine.tolerance()
        ));

        let result = self.run_frames();
        self.state = LoopState::Stopping;
        let released = self.release();
        self.logger.summary();

        let summary = match (result, released) {
            (Ok(summary), Ok(())) => summary,
            (Ok(summary), Err(e)) => match self.sink_policy {
                SinkErrorPolicy::Abort => return Err(e),
                SinkErrorPolicy::Continue => {
                    log::warn!("{e}");
                    summary
                }
            },
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(release)) => return Err(e.with_release_failure(release)),
        };
        self.logger.info(&format!(
            "Stopped after {} frames ({:?})",
            summary.frames_processed,
            summary.stop_reason
        ));
        Ok(summary)
    }

    fn run_frames(&mut self) -> Result<RunSummary, RecognitionError> {
        let mut frames_processed = 0;
        loop {
            let started = Instant::now();
            let next = self
                .source
                .next_frame()
                .map_err(|e| RecognitionError::FrameSource(e.to_string()))?;
            let Some(frame) = next else {
                return Ok(RunSummary {
                    frames_processed,
                    stop_reason: StopReason::EndOfStream,
                });
            };
            self.logger.timing(STAGE_CAPTURE, elapsed_ms(started));

            let annotated = self.process(frame);
            frames_processed += 1;
            self.logger.progress(frames_processed);

            self.record(&annotated)?;
            if let Some(reason) = self.present(&annotated)? {
                return Ok(RunSummary {
                    frames_processed,
                    stop_reason: reason,
                });
            }
        }
    }

    /// Runs identification on one captured frame and returns the annotated
    /// display frame.
    fn process(&mut self, frame: Frame) -> Frame {
        let mut display = frame.into_rgb();
        display.mirror_horizontal();
        let working = display.resize_to_width(self.working_width);
        let geometry = FrameGeometry::new(display.width(), working.width());

        let faces = self.identify_faces(&working);
        self.logger.metric(METRIC_FACES, faces.len() as f64);
        log::debug!("Frame {}: {} faces", display.index(), faces.len());

        let started = Instant::now();
        let (boxes, labels): (Vec<_>, Vec<_>) = faces.into_iter().unzip();
        let annotations: Vec<Annotation> = geometry
            .rescale_all(&boxes)
            .into_iter()
            .zip(labels)
            .map(|(face, label)| Annotation::new(face, label))
            .collect();
        if let Err(e) = self.annotator.annotate(&mut display, &annotations) {
            log::warn!("Annotating frame {} failed: {e}", display.index());
        }
        self.logger.timing(STAGE_RENDER, elapsed_ms(started));
        display
    }

    /// Working-space boxes paired with their labels, in locator order.
    fn identify_faces(&mut self, working: &Frame) -> Vec<(BoundingBox<WorkingSpace>, String)> {
        let started = Instant::now();
        let located = self.locator.locate(working);
        self.logger.timing(STAGE_DETECT, elapsed_ms(started));
        let boxes = match located {
            Ok(boxes) => boxes,
            Err(e) => {
                log::warn!("Face localization failed on frame {}: {e}", working.index());
                return Vec::new();
            }
        };
        if boxes.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let extracted = self.extractor.extract(working, &boxes);
        self.logger.timing(STAGE_EMBED, elapsed_ms(started));
        let embeddings = match extracted {
            Ok(embeddings) if embeddings.len() == boxes.len() => embeddings,
            Ok(embeddings) => {
                log::warn!(
                    "Frame {}: {} embeddings for {} faces, skipping",
                    working.index(),
                    embeddings.len(),
                    boxes.len()
                );
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Embedding failed on frame {}: {e}", working.index());
                return Vec::new();
            }
        };

        let started = Instant::now();
        let labels = self.engine.identify_all(&embeddings);
        self.logger.timing(STAGE_IDENTIFY, elapsed_ms(started));

        boxes.into_iter().zip(labels).collect()
    }

    fn record(&mut self, frame: &Frame) -> Result<(), RecognitionError> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let started = Instant::now();
        let written = sink.write(frame);
        self.logger.timing(STAGE_WRITE, elapsed_ms(started));

        let Err(e) = written else {
            return Ok(());
        };
        match self.sink_policy {
            SinkErrorPolicy::Abort => Err(e.into()),
            SinkErrorPolicy::Continue => {
                log::warn!("{e}; continuing without recording");
                if let Some(mut sink) = self.sink.take() {
                    if let Err(e) = sink.finish() {
                        log::warn!("{e}");
                    }
                }
                Ok(())
            }
        }
    }

    /// Shows the frame, if a display is attached, and applies the stop
    /// predicate once.
    fn present(&mut self, frame: &Frame) -> Result<Option<StopReason>, RecognitionError> {
        let (key, window_open) = match self.display.as_mut() {
            Some(display) => {
                display
                    .show(frame)
                    .map_err(|e| RecognitionError::Display(e.to_string()))?;
                (display.poll_key(), display.is_open())
            }
            None => (None, true),
        };
        Ok(stop_reason(
            key,
            window_open,
            self.terminate.load(Ordering::SeqCst),
        ))
    }

    /// Closes the source and display and finalizes the output sink.
    /// Later calls are no-ops.
    fn release(&mut self) -> Result<(), RecognitionError> {
        if self.state == LoopState::Stopped {
            return Ok(());
        }
        self.source.close();
        if let Some(mut display) = self.display.take() {
            display.close();
        }
        let finished = match self.sink.take() {
            Some(mut sink) => sink.finish().map_err(RecognitionError::from),
            None => Ok(()),
        };
        self.state = LoopState::Stopped;
        finished
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("{e}");
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

use std::collections::HashMap;
use std::time::Instant;

/// Stage names recorded by the frame loop, in processing order.
pub const STAGE_CAPTURE: &str = "capture";
pub const STAGE_DETECT: &str = "detect";
pub const STAGE_EMBED: &str = "embed";
pub const STAGE_IDENTIFY: &str = "identify";
pub const STAGE_RENDER: &str = "render";
pub const STAGE_WRITE: &str = "write";

/// Faces found per frame.
pub const METRIC_FACES: &str = "faces";

/// Observer for frame loop events.
///
/// Keeps the loop free of any particular reporting mechanism; the CLI
/// prints a summary, tests discard everything.
pub trait PipelineLogger: Send {
    /// Called after each frame with the running count of processed frames.
    fn progress(&mut self, frames_processed: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame metric such as the number of faces.
    fn metric(&mut self, name: &str, value: f64);

    /// Lifecycle messages such as start and stop of the frame loop.
    fn info(&mut self, message: &str);

    /// Emit the end-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames_processed: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count and sum of the samples seen for one stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    count: usize,
    total: f64,
}

impl RunningStat {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Collects per-stage timings and metrics and reports them through `log`.
///
/// A live stream has no known length, so progress is a plain frame count
/// logged every `throttle_frames` frames, and samples are folded into
/// running totals rather than kept.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
    start_time: Instant,
    frames: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted report, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Recognition summary ({} frames, {:.1}s):",
            self.frames,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort_by(|a, b| stage_rank(a).cmp(&stage_rank(b)));
        for stage in stages {
            let stat = &self.timings[stage];
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  total {:7.0}ms",
                stat.mean(),
                stat.total()
            ));
        }

        if let Some(faces) = self.metrics.get(METRIC_FACES) {
            lines.push(format!("  Faces per frame: avg {:.2}", faces.mean()));
        }

        if self.frames > 0 && elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, frames_processed: usize) {
        self.frames = frames_processed;
        if frames_processed % self.throttle_frames == 0 {
            log::info!("Processed {frames_processed} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

/// Known stages sort in pipeline order, anything else after them.
fn stage_rank(stage: &str) -> (usize, &str) {
    let order = [
        STAGE_CAPTURE,
        STAGE_DETECT,
        STAGE_EMBED,
        STAGE_IDENTIFY,
        STAGE_RENDER,
        STAGE_WRITE,
    ];
    let rank = order.iter().position(|s| *s == stage).unwrap_or(order.len());
    (rank, stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1);
        logger.timing(STAGE_DETECT, 5.0);
        logger.metric(METRIC_FACES, 2.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_accumulates_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(STAGE_DETECT, 20.0);
        logger.timing(STAGE_DETECT, 30.0);
        logger.timing(STAGE_EMBED, 5.0);

        let detect = logger.timings_for(STAGE_DETECT).unwrap();
        assert_eq!(detect.count(), 2);
        assert_relative_eq!(detect.total(), 50.0);
        assert_relative_eq!(detect.mean(), 25.0);
        assert_eq!(logger.timings_for(STAGE_EMBED).unwrap().count(), 1);
        assert!(logger.timings_for(STAGE_WRITE).is_none());
    }

    #[test]
    fn test_long_run_keeps_totals_not_samples() {
        let mut logger = StdoutPipelineLogger::new(1000);
        for frame in 1..=100_000 {
            logger.timing(STAGE_DETECT, 2.0);
            logger.metric(METRIC_FACES, (frame % 3) as f64);
            logger.progress(frame);
        }

        let detect = logger.timings_for(STAGE_DETECT).unwrap();
        assert_eq!(detect.count(), 100_000);
        assert_relative_eq!(detect.mean(), 2.0);
        let faces = logger.metrics_for(METRIC_FACES).unwrap();
        assert_eq!(faces.count(), 100_000);
        assert_relative_eq!(faces.mean(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_summary_lists_stages_in_pipeline_order() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(STAGE_WRITE, 1.0);
        logger.timing(STAGE_CAPTURE, 1.0);
        logger.timing(STAGE_IDENTIFY, 1.0);

        let summary = logger.summary_string().unwrap();
        let capture = summary.find("capture").unwrap();
        let identify = summary.find("identify").unwrap();
        let write = summary.find("write").unwrap();
        assert!(capture < identify && identify < write);
    }

    #[test]
    fn test_summary_reports_faces_per_frame() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric(METRIC_FACES, 1.0);
        logger.metric(METRIC_FACES, 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Faces per frame: avg 1.50"));
    }

    #[test]
    fn test_summary_includes_throughput_once_frames_counted() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(100);
        logger.timing(STAGE_DETECT, 10.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("100 frames"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_running_stat_mean() {
        let mut stat = RunningStat::default();
        assert_eq!(stat.mean(), 0.0);
        for value in [10.0, 20.0, 30.0] {
            stat.record(value);
        }
        assert_relative_eq!(stat.mean(), 20.0);
    }

    #[test]
    fn test_unknown_stage_sorts_last() {
        assert!(stage_rank("zzz") > stage_rank(STAGE_WRITE));
        assert!(stage_rank(STAGE_CAPTURE) < stage_rank(STAGE_DETECT));
    }

    #[test]
    fn test_throttle_never_zero() {
        let logger = StdoutPipelineLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
    }
}

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detection::domain::detection_model::DetectionModel;
use crate::shared::constants::{
    DEFAULT_CAMERA, DEFAULT_OUTPUT_FPS, DEFAULT_WARMUP_MS, DEFAULT_WORKING_WIDTH,
};

use super::recognition_error::RecognitionError;

/// What the frame loop does when the output video cannot be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkErrorPolicy {
    /// Stop the run and report the failure.
    #[default]
    Abort,
    /// Finalize what was recorded so far and keep running without recording.
    Continue,
}

impl fmt::Display for SinkErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkErrorPolicy::Abort => write!(f, "abort"),
            SinkErrorPolicy::Continue => write!(f, "continue"),
        }
    }
}

impl FromStr for SinkErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(SinkErrorPolicy::Abort),
            "continue" => Ok(SinkErrorPolicy::Continue),
            other => Err(format!(
                "Sink error policy must be 'abort' or 'continue', got '{other}'"
            )),
        }
    }
}

/// Options for one recognition run.
///
/// Loadable from JSON; every field except `encodings_path` has a default,
/// and `validate` must pass before the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecognitionConfig {
    pub encodings_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub display: bool,
    pub detection_model: DetectionModel,
    /// Match threshold; the embedding extractor's recommendation when absent.
    pub tolerance: Option<f64>,
    pub working_width: u32,
    pub output_fps: f64,
    pub source: String,
    pub warmup_ms: u64,
    pub on_sink_error: SinkErrorPolicy,
    pub model_dir: Option<PathBuf>,
    pub model_base_url: Option<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            encodings_path: None,
            output_path: None,
            display: true,
            detection_model: DetectionModel::default(),
            tolerance: None,
            working_width: DEFAULT_WORKING_WIDTH,
            output_fps: DEFAULT_OUTPUT_FPS,
            source: DEFAULT_CAMERA.to_string(),
            warmup_ms: DEFAULT_WARMUP_MS,
            on_sink_error: SinkErrorPolicy::default(),
            model_dir: None,
            model_base_url: None,
        }
    }
}

impl RecognitionConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, RecognitionError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RecognitionError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            RecognitionError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })
    }

    pub fn validate(&self) -> Result<(), RecognitionError> {
        self.encodings_path()?;
        if let Some(tolerance) = self.tolerance {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(RecognitionError::Configuration(format!(
                    "tolerance must be a positive number, got {tolerance}"
                )));
            }
        }
        if self.working_width == 0 {
            return Err(RecognitionError::Configuration(
                "working width must be at least 1 pixel".to_string(),
            ));
        }
        if !self.output_fps.is_finite() || self.output_fps <= 0.0 {
            return Err(RecognitionError::Configuration(format!(
                "output fps must be positive, got {}",
                self.output_fps
            )));
        }
        if self.source.trim().is_empty() {
            return Err(RecognitionError::Configuration(
                "frame source must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn encodings_path(&self) -> Result<&Path, RecognitionError> {
        self.encodings_path.as_deref().ok_or_else(|| {
            RecognitionError::Configuration("path to the gallery encodings is required".to_string())
        })
    }

    /// The configured tolerance, or `recommended` when none was set.
    pub fn resolve_tolerance(&self, recommended: f64) -> f64 {
        self.tolerance.unwrap_or(recommended)
    }
}

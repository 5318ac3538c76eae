/// Label assigned to a face that matches no gallery entry.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Width, in pixels, of the downscaled frame used for face localization.
pub const DEFAULT_WORKING_WIDTH: u32 = 700;

/// Frame rate stamped on recorded output.
pub const DEFAULT_OUTPUT_FPS: f64 = 15.0;

/// Camera settle time after the source is opened.
pub const DEFAULT_WARMUP_MS: u64 = 2000;

pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const YOLO_FACE_MODEL_NAME: &str = "yolo11n-face.onnx";
pub const ARCFACE_MODEL_NAME: &str = "arcface_w600k_r50.onnx";

/// Title of the interactive output window.
pub const WINDOW_TITLE: &str = "Output";

#[cfg(target_os = "linux")]
pub const DEFAULT_CAMERA: &str = "/dev/video0";
#[cfg(target_os = "macos")]
pub const DEFAULT_CAMERA: &str = "0";
#[cfg(target_os = "windows")]
pub const DEFAULT_CAMERA: &str = "video=Integrated Camera";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const DEFAULT_CAMERA: &str = "/dev/video0";

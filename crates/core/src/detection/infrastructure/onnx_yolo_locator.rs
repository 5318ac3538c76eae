/// YOLO face locator using ONNX Runtime via `ort`.
///
/// The accurate locator, backing the `cnn` detection model. Handles
/// letterbox preprocessing, inference and NMS post-processing. Each frame
/// is located independently.
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::{BoundingBox, WorkingSpace};
use crate::shared::frame::Frame;

use super::execution_provider::session_builder;
use super::math::{nms, RawDetection};

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

pub struct OnnxYoloLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloLocator {
    /// Load a YOLO ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = session_builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded YOLO face model from {} (input {input_size}px)",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceLocator for OnnxYoloLocator {
    fn locate(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<BoundingBox<WorkingSpace>>, Box<dyn std::error::Error>> {
        let (input_tensor, geometry) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_rows(data, &shape, self.confidence, &geometry);
        let kept = nms(&mut raw, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .filter_map(|d| d.to_box(frame.width(), frame.height()))
            .collect())
    }
}

/// Mapping from letterboxed model coordinates back to the frame.
struct LetterboxGeometry {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

/// Letterbox-resize a frame to `target_size` × `target_size`, padding with
/// YOLO gray (114).
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxGeometry) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        LetterboxGeometry {
            scale,
            pad_x,
            pad_y,
        },
    )
}

/// Parses `[1, features, detections]` or `[1, detections, features]` output
/// rows of `[cx, cy, w, h, conf, ..]` back into frame coordinates.
fn parse_rows(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    lb: &LetterboxGeometry,
) -> Vec<RawDetection> {
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Vec::new();
    }

    let at = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data.get(idx).copied().unwrap_or(0.0) as f64
    };

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let conf = at(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        let px = lb.pad_x as f64;
        let py = lb.pad_y as f64;
        dets.push(RawDetection {
            x1: (cx - w / 2.0 - px) / lb.scale,
            y1: (cy - h / 2.0 - py) / lb.scale,
            x2: (cx + w / 2.0 - px) / lb.scale,
            y2: (cy + h / 2.0 - py) / lb.scale,
            score: conf,
        });
    }
    dets
}

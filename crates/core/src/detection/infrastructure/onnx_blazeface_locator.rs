/// BlazeFace face locator using ONNX Runtime via `ort`.
///
/// The fast locator: a single small network producing boxes only. Backs
/// the `hog` detection model.
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::{BoundingBox, WorkingSpace};
use crate::shared::frame::Frame;

use super::execution_provider::session_builder;
use super::math::{nms, sigmoid, RawDetection};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output (box deltas + 6 keypoints).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceLocator {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceLocator {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = session_builder()?.commit_from_file(model_path)?;
        log::debug!("Loaded BlazeFace model from {}", model_path.display());
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceLocator for OnnxBlazefaceLocator {
    fn locate(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<BoundingBox<WorkingSpace>>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let mut raw = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence as f32,
            frame.width(),
            frame.height(),
        );
        let kept = nms(&mut raw, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .filter_map(|d| d.to_box(frame.width(), frame.height()))
            .collect())
    }
}

/// Decodes anchor-relative boxes above `confidence` into frame pixels.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    fw: u32,
    fh: u32,
) -> Vec<RawDetection> {
    let mut dets = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }

        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[offset + 1] / INPUT_SIZE as f32;
        let w = reg_data[offset + 2] / INPUT_SIZE as f32;
        let h = reg_data[offset + 3] / INPUT_SIZE as f32;

        dets.push(RawDetection {
            x1: ((cx - w / 2.0) * fw as f32) as f64,
            y1: ((cy - h / 2.0) * fh as f32) as f64,
            x2: ((cx + w / 2.0) * fw as f32) as f64,
            y2: ((cy + h / 2.0) * fh as f32) as f64,
            score: score as f64,
        });
    }
    dets
}

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Short-range anchors: a 16×16 grid with 2 anchors per cell, then an
/// 8×8 grid with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::rgb(vec![128u8; 200 * 100 * 3], 200, 100, 0);
        let tensor = preprocess(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::rgb(vec![255u8; 50 * 50 * 3], 50, 50, 0);
        let tensor = preprocess(&frame, 128);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_generate_anchors_count() {
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in &generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_decode_skips_low_scores() {
        let anchors = vec![[0.5, 0.5]; 2];
        let reg = vec![0.0; 2 * REGRESSOR_STRIDE];
        let scores = vec![-10.0, -10.0];
        assert!(decode(&reg, &scores, &anchors, 0.5, 100, 100).is_empty());
    }

    #[test]
    fn test_decode_centers_box_on_anchor() {
        let anchors = vec![[0.5, 0.5]];
        let mut reg = vec![0.0; REGRESSOR_STRIDE];
        // 32/128 of the frame in each direction
        reg[2] = 32.0;
        reg[3] = 32.0;
        let dets = decode(&reg, &[10.0], &anchors, 0.5, 400, 200);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x1 - 150.0).abs() < 1e-3);
        assert!((d.x2 - 250.0).abs() < 1e-3);
        assert!((d.y1 - 75.0).abs() < 1e-3);
        assert!((d.y2 - 125.0).abs() < 1e-3);
    }

    #[test]
    fn test_decoded_box_maps_to_trbl() {
        let anchors = vec![[0.5, 0.5]];
        let mut reg = vec![0.0; REGRESSOR_STRIDE];
        reg[2] = 32.0;
        reg[3] = 32.0;
        let dets = decode(&reg, &[10.0], &anchors, 0.5, 400, 200);
        let b = dets[0].to_box(400, 200).unwrap();
        assert_eq!((b.top, b.right, b.bottom, b.left), (75, 250, 125, 150));
    }
}

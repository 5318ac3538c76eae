/// ArcFace face embedding extractor using ONNX Runtime.
///
/// Crops each located face from the working frame, resizes it to 112×112
/// and returns the L2-normalized 512-d embedding widened to `f64`.
use std::path::Path;

use crate::detection::domain::embedding_extractor::EmbeddingExtractor;
use crate::recognition::domain::embedding::Embedding;
use crate::shared::bounding_box::{BoundingBox, WorkingSpace};
use crate::shared::frame::Frame;

use super::execution_provider::session_builder;
use super::math::l2_normalize;

/// Euclidean distance between unit vectors matching cosine similarity 0.4.
pub const DEFAULT_TOLERANCE: f64 = 1.1;

pub const EMBEDDING_DIMENSION: usize = 512;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxArcfaceExtractor {
    session: ort::session::Session,
}

impl OnnxArcfaceExtractor {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = session_builder()?.commit_from_file(model_path)?;
        log::debug!("Loaded ArcFace model from {}", model_path.display());
        Ok(Self { session })
    }

    fn embed(
        &mut self,
        frame: &Frame,
        face: &BoundingBox<WorkingSpace>,
    ) -> Result<Embedding, Box<dyn std::error::Error>> {
        let tensor = preprocess(frame, face);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;
        if embedding_slice.len() != EMBEDDING_DIMENSION {
            return Err(format!(
                "ArcFace model produced {} values, expected {EMBEDDING_DIMENSION}",
                embedding_slice.len()
            )
            .into());
        }

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(Embedding::new(embedding.into_iter().map(f64::from).collect()))
    }
}

impl EmbeddingExtractor for OnnxArcfaceExtractor {
    fn extract(
        &mut self,
        frame: &Frame,
        boxes: &[BoundingBox<WorkingSpace>],
    ) -> Result<Vec<Embedding>, Box<dyn std::error::Error>> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }
        boxes.iter().map(|b| self.embed(frame, b)).collect()
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn default_tolerance(&self) -> f64 {
        DEFAULT_TOLERANCE
    }
}

/// Crops `face` out of `frame`, resizes to 112x112, normalizes, NCHW layout.
///
/// A box falling entirely outside the frame yields a tensor built from the
/// whole frame so every located face still gets exactly one embedding.
fn preprocess(frame: &Frame, face: &BoundingBox<WorkingSpace>) -> ndarray::Array4<f32> {
    let (x0, y0, crop_w, crop_h) = match face.clamp(frame.width(), frame.height()) {
        Some(b) => (
            b.left as usize,
            b.top as usize,
            b.width() as usize,
            b.height() as usize,
        ),
        None => (0, 0, frame.width() as usize, frame.height() as usize),
    };
    let src = frame.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y = y0 + sample(y, crop_h);
        for x in 0..INPUT_SIZE {
            let src_x = x0 + sample(x, crop_w);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}

/// Nearest source index for output pixel `i` when stretching `len` to 112.
fn sample(i: usize, len: usize) -> usize {
    (((i as f64 + 0.5) * len as f64 / INPUT_SIZE as f64) as usize).min(len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(w: u32, h: u32, value: u8) -> Frame {
        Frame::rgb(vec![value; (w * h * 3) as usize], w, h, 0)
    }

    fn face(top: i32, right: i32, bottom: i32, left: i32) -> BoundingBox<WorkingSpace> {
        BoundingBox::new(top, right, bottom, left)
    }

    #[test]
    fn test_default_tolerance_matches_cosine_threshold() {
        // |a - b|^2 = 2 - 2cos for unit vectors
        let cos = 1.0 - DEFAULT_TOLERANCE * DEFAULT_TOLERANCE / 2.0;
        assert!((cos - 0.395).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_shape() {
        let tensor = preprocess(&frame(50, 50, 128), &face(0, 50, 50, 0));
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let tensor = preprocess(&frame(10, 10, 127), &face(0, 10, 10, 0));
        let expected = (127.0 - 127.5) / 127.5;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_normalization_bounds() {
        let max = preprocess(&frame(10, 10, 255), &face(0, 10, 10, 0));
        assert!((max[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
        let min = preprocess(&frame(10, 10, 0), &face(0, 10, 10, 0));
        assert!((min[[0, 0, 0, 0]] + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_reads_only_the_crop() {
        // left half black, right half white; crop the right half
        let (w, h) = (20u32, 10u32);
        let mut data = vec![0u8; (w * h * 3) as usize];
        for y in 0..h {
            for x in 10..w {
                let i = ((y * w + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let tensor = preprocess(&Frame::rgb(data, w, h, 0), &face(0, 20, 10, 10));
        assert!(tensor.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_preprocess_clips_overhanging_box() {
        let tensor = preprocess(&frame(30, 30, 255), &face(-10, 40, 40, -10));
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        assert!((tensor[[0, 2, 111, 111]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_box_outside_frame_uses_whole_frame() {
        let tensor = preprocess(&frame(30, 30, 0), &face(100, 140, 140, 100));
        assert!((tensor[[0, 0, 0, 0]] + 1.0).abs() < 0.01);
    }
}

//! Shared math for the ONNX detection backends.
//!
//! Candidate boxes, greedy non-maximum suppression and vector
//! normalization used by both locators and the embedding extractor.

use crate::shared::bounding_box::{BoundingBox, WorkingSpace};

/// A scored candidate box in frame pixel coordinates, `x2`/`y2` exclusive.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
}

impl RawDetection {
    /// Converts to a `(top, right, bottom, left)` box clipped to the frame.
    pub fn to_box(&self, frame_w: u32, frame_h: u32) -> Option<BoundingBox<WorkingSpace>> {
        BoundingBox::new(
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
            self.x1.round() as i32,
        )
        .clamp(frame_w, frame_h)
    }

    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Greedy NMS: sort by score descending, suppress boxes overlapping a kept one.
pub fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i].corners(), &dets[j].corners()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_bbox_iou_no_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_bbox_iou_perfect_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((bbox_iou(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bbox_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 5.0, 15.0, 15.0];
        let expected = 25.0 / 175.0;
        assert!((bbox_iou(&a, &b) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_nms_suppresses_overlap_keeping_best() {
        let mut dets = vec![
            det(5.0, 5.0, 105.0, 105.0, 0.7),
            det(0.0, 0.0, 100.0, 100.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_separate_boxes_sorted_by_score() {
        let mut dets = vec![
            det(200.0, 200.0, 250.0, 250.0, 0.8),
            det(0.0, 0.0, 50.0, 50.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_to_box_maps_corners_to_trbl() {
        let b = det(10.0, 20.0, 50.0, 80.0, 1.0).to_box(100, 100).unwrap();
        assert_eq!((b.top, b.right, b.bottom, b.left), (20, 50, 80, 10));
    }

    #[test]
    fn test_to_box_clips_and_drops_outside() {
        let b = det(-10.0, -5.0, 50.0, 80.0, 1.0).to_box(40, 60).unwrap();
        assert_eq!((b.top, b.right, b.bottom, b.left), (0, 40, 60, 0));
        assert!(det(120.0, 0.0, 150.0, 10.0, 1.0).to_box(100, 100).is_none());
    }

    #[test]
    fn test_l2_normalize_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!((sigmoid(10.0) - 1.0).abs() < 0.001);
        assert!(sigmoid(-10.0) < 0.001);
    }
}

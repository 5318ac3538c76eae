/// Stream properties reported by a frame source or fixed for an output sink.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
}

impl VideoMetadata {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            codec: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let meta = VideoMetadata {
            width: 1280,
            height: 720,
            fps: 30.0,
            codec: "mjpeg".to_string(),
        };
        assert_eq!(meta.width, 1280);
        assert_eq!(meta.height, 720);
        assert_eq!(meta.fps, 30.0);
        assert_eq!(meta.codec, "mjpeg");
    }

    #[test]
    fn test_new_leaves_codec_empty() {
        let meta = VideoMetadata::new(640, 480, 15.0);
        assert!(meta.codec.is_empty());
        assert_eq!(meta.clone(), meta);
    }
}

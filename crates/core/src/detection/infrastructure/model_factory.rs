use crate::detection::domain::detection_model::DetectionModel;
use crate::detection::domain::embedding_extractor::EmbeddingExtractor;
use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::constants::{ARCFACE_MODEL_NAME, BLAZEFACE_MODEL_NAME, YOLO_FACE_MODEL_NAME};

use super::model_resolver::{self, ModelSources, ProgressFn};
use super::onnx_arcface_extractor::OnnxArcfaceExtractor;
use super::onnx_blazeface_locator::{self, OnnxBlazefaceLocator};
use super::onnx_yolo_locator::{self, OnnxYoloLocator};

/// Model file backing each detection model.
pub fn locator_model_name(model: DetectionModel) -> &'static str {
    match model {
        DetectionModel::Hog => BLAZEFACE_MODEL_NAME,
        DetectionModel::Cnn => YOLO_FACE_MODEL_NAME,
    }
}

/// Resolves and loads the face locator for `model`, reporting download
/// progress to `progress` if the model has to be fetched.
///
/// `hog` selects the fast BlazeFace network, `cnn` the slower but more
/// accurate YOLO face network.
pub fn create_locator(
    model: DetectionModel,
    sources: &ModelSources,
    progress: Option<ProgressFn>,
) -> Result<Box<dyn FaceLocator>, Box<dyn std::error::Error>> {
    let path = model_resolver::resolve(locator_model_name(model), sources, progress)?;
    log::info!("Using {model} face locator ({})", path.display());
    match model {
        DetectionModel::Hog => Ok(Box::new(OnnxBlazefaceLocator::new(
            &path,
            onnx_blazeface_locator::DEFAULT_CONFIDENCE,
        )?)),
        DetectionModel::Cnn => Ok(Box::new(OnnxYoloLocator::new(
            &path,
            onnx_yolo_locator::DEFAULT_CONFIDENCE,
        )?)),
    }
}

/// Resolves and loads the ArcFace embedding extractor.
pub fn create_extractor(
    sources: &ModelSources,
    progress: Option<ProgressFn>,
) -> Result<Box<dyn EmbeddingExtractor>, Box<dyn std::error::Error>> {
    let path = model_resolver::resolve(ARCFACE_MODEL_NAME, sources, progress)?;
    log::info!("Using ArcFace embedding extractor ({})", path.display());
    Ok(Box::new(OnnxArcfaceExtractor::new(&path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::fast(DetectionModel::Hog, BLAZEFACE_MODEL_NAME)]
    #[case::accurate(DetectionModel::Cnn, YOLO_FACE_MODEL_NAME)]
    fn test_locator_model_name(#[case] model: DetectionModel, #[case] expected: &str) {
        assert_eq!(locator_model_name(model), expected);
    }

    #[test]
    fn test_create_locator_missing_model_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let sources = ModelSources {
            model_dir: None,
            cache_dir: Some(tmp.path().to_path_buf()),
            base_url: None,
        };
        let err = create_locator(DetectionModel::Hog, &sources, None).err().unwrap();
        assert!(err.to_string().contains(BLAZEFACE_MODEL_NAME));
    }

    #[test]
    fn test_create_extractor_missing_model_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let sources = ModelSources {
            model_dir: Some(tmp.path().to_path_buf()),
            cache_dir: Some(tmp.path().join("cache")),
            base_url: None,
        };
        assert!(create_extractor(&sources, None).is_err());
    }
}

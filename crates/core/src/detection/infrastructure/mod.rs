pub mod execution_provider;
pub mod math;
pub mod model_factory;
pub mod model_resolver;
pub mod onnx_arcface_extractor;
pub mod onnx_blazeface_locator;
pub mod onnx_yolo_locator;

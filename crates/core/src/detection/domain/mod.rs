pub mod detection_model;
pub mod embedding_extractor;
pub mod face_locator;

pub mod embedding;
pub mod frame_geometry;
pub mod gallery_error;
pub mod gallery_index;
pub mod gallery_store;
pub mod identification_engine;

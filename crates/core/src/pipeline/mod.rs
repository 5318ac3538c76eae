pub mod frame_loop;
pub mod pipeline_logger;
pub mod recognition_config;
pub mod recognition_error;

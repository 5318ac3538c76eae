pub mod frame_display;
pub mod frame_source;
pub mod output_sink;
pub mod video_writer;

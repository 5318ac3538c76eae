pub mod ffmpeg_frame_source;
pub mod ffmpeg_writer;
pub mod minifb_display;

use std::path::Path;

use crate::shared::frame::{ColorOrder, Frame};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// Decodes frames from a capture device or a video file via ffmpeg-next.
///
/// Device paths open through libavdevice (`v4l2` on Linux, `avfoundation`
/// on macOS, `dshow` on Windows); anything else opens as a file or URL.
/// Frames come out as packed BGR24, the byte order cameras conventionally
/// deliver.
pub struct FfmpegFrameSource {
    state: Option<DecodeState>,
}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    frame_index: usize,
    flushing: bool,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self, source: &str) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = match capture_format(source) {
            Some(format_name) => open_device(source, format_name)?,
            None => ffmpeg_next::format::input(Path::new(source))?,
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = match stream.rate() {
            r if r.denominator() != 0 && r.numerator() != 0 => r,
            _ => stream.avg_frame_rate(),
        };
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(format!("{source}: video stream reports no frame size").into());
        }

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::BGR24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
        };

        log::info!(
            "Opened {source}: {width}x{height} @ {fps:.2} fps ({})",
            metadata.codec
        );

        self.state = Some(DecodeState {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            frame_index: 0,
            flushing: false,
        });

        Ok(metadata)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let state = self
            .state
            .as_mut()
            .ok_or("FfmpegFrameSource: not opened")?;
        state.next_frame()
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Frame source released");
        }
    }
}

impl DecodeState {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return self.try_receive();
            };

            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut bgr_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut bgr_frame)?;

        let pixels = extract_packed_pixels(&bgr_frame, self.width, self.height);
        let frame = Frame::new(
            pixels,
            self.width,
            self.height,
            ColorOrder::Bgr,
            self.frame_index,
        );
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

/// Whether `source` names a live capture device rather than a file or URL.
pub fn is_capture_device(source: &str) -> bool {
    capture_format(source).is_some()
}

/// libavdevice input format for `source`, or `None` for files and URLs.
fn capture_format(source: &str) -> Option<&'static str> {
    if source.starts_with("/dev/video") {
        return Some("v4l2");
    }
    if cfg!(target_os = "macos") && !source.is_empty() && source.bytes().all(|b| b.is_ascii_digit())
    {
        return Some("avfoundation");
    }
    if cfg!(target_os = "windows") && source.starts_with("video=") {
        return Some("dshow");
    }
    None
}

fn open_device(
    source: &str,
    format_name: &str,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    ffmpeg_next::device::register_all();

    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == format_name)
        .ok_or_else(|| format!("capture backend '{format_name}' is not available"))?;

    let mut options = ffmpeg_next::Dictionary::new();
    if format_name == "avfoundation" {
        options.set("framerate", "30");
    }

    match ffmpeg_next::format::open_with(Path::new(source), &format, options)? {
        ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
        ffmpeg_next::format::context::Context::Output(_) => {
            Err(format!("{source} did not open as a capture input").into())
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly packed buffer,
/// dropping any per-row stride padding.
fn extract_packed_pixels(
    frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes `num_frames` solid-color frames to an MPEG4 file.
    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        let fps = 15;
        ffmpeg_next::init().unwrap();

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        let drain = |encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
                         octx: &mut ffmpeg_next::format::context::Output| {
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb_frame.stride(0);
            let value = ((i * 40) % 256) as u8;
            let data = rgb_frame.data_mut(0);
            for row in 0..height as usize {
                for col in 0..width as usize * 3 {
                    data[row * stride + col] = value;
                }
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();
            drain(&mut encoder, &mut octx);
        }

        encoder.send_eof().unwrap();
        drain(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    fn drain_frames(source: &mut FfmpegFrameSource) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120);

        let mut source = FfmpegFrameSource::new();
        let meta = source.open(path.to_str().unwrap()).unwrap();
        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert!(meta.fps > 0.0);
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let mut source = FfmpegFrameSource::new();
        assert!(source.open("/nonexistent/clip.mp4").is_err());
    }

    #[test]
    fn test_yields_every_frame_then_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120);

        let mut source = FfmpegFrameSource::new();
        source.open(path.to_str().unwrap()).unwrap();
        let frames = drain_frames(&mut source);

        assert_eq!(frames.len(), 5);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_frames_are_bgr_with_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 3, 160, 120);

        let mut source = FfmpegFrameSource::new();
        source.open(path.to_str().unwrap()).unwrap();

        for (i, frame) in drain_frames(&mut source).iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.order(), ColorOrder::Bgr);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_next_frame_without_open_fails() {
        let mut source = FfmpegFrameSource::new();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 1, 160, 120);

        let mut source = FfmpegFrameSource::new();
        source.open(path.to_str().unwrap()).unwrap();
        source.close();
        source.close();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_files_and_urls_are_not_devices() {
        assert_eq!(capture_format("clip.mp4"), None);
        assert!(!is_capture_device("clip.mp4"));
        assert_eq!(capture_format("rtsp://camera.local/stream"), None);
    }

    #[test]
    fn test_v4l2_device_path() {
        assert_eq!(capture_format("/dev/video0"), Some("v4l2"));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_avfoundation_index() {
        assert_eq!(capture_format("0"), Some("avfoundation"));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_dshow_device_name() {
        assert_eq!(capture_format("video=Integrated Camera"), Some("dshow"));
    }
}

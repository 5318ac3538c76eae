use std::path::Path;

use crate::shared::frame::{ColorOrder, Frame};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Frame rate used when the requested one rounds to zero or less.
const FALLBACK_FPS: i32 = 15;

/// Encodes frames to Motion JPEG via ffmpeg-next.
///
/// The container is chosen from the output path's extension (`.avi` is the
/// natural fit for MJPEG). Every frame must match the size given to `open`.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<(ColorOrder, ffmpeg_next::software::scaling::Context)>,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps: FALLBACK_FPS,
            frame_count: 0,
        }
    }

    /// Packed-pixel converter for `order`, rebuilt only when the order changes.
    fn scaler_for(
        &mut self,
        order: ColorOrder,
    ) -> Result<&mut ffmpeg_next::software::scaling::Context, Box<dyn std::error::Error>> {
        let stale = !matches!(&self.scaler, Some((o, _)) if *o == order);
        if stale {
            let src_format = match order {
                ColorOrder::Rgb => ffmpeg_next::format::Pixel::RGB24,
                ColorOrder::Bgr => ffmpeg_next::format::Pixel::BGR24,
            };
            let ctx = ffmpeg_next::software::scaling::Context::get(
                src_format,
                self.width,
                self.height,
                ffmpeg_next::format::Pixel::YUVJ420P,
                self.width,
                self.height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some((order, ctx));
        }
        match self.scaler.as_mut() {
            Some((_, ctx)) => Ok(ctx),
            None => Err("FfmpegWriter: scaler unavailable".into()),
        }
    }

    /// Flushes the encoder and writes the container trailer, if opened.
    fn finalize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        encoder.send_eof()?;
        self.drain_packets()?;
        if let Some(octx) = self.octx.as_mut() {
            octx.write_trailer()?;
        }
        Ok(())
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Ok(());
        };
        let ost_time_base = octx
            .stream(0)
            .ok_or("FfmpegWriter: no output stream")?
            .time_base();
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let fps = metadata.fps.round() as i32;
        self.fps = if fps <= 0 { FALLBACK_FPS } else { fps };
        self.width = metadata.width;
        self.height = metadata.height;

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MJPEG)
            .ok_or("MJPEG encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUVJ420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(ffmpeg_next::Rational(1, self.fps));

        octx.write_header()?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = None;
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_none() {
            return Err("FfmpegWriter: not opened".into());
        }
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame is {}x{}, writer was opened at {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let src_format = match frame.order() {
            ColorOrder::Rgb => ffmpeg_next::format::Pixel::RGB24,
            ColorOrder::Bgr => ffmpeg_next::format::Pixel::BGR24,
        };
        let mut packed =
            ffmpeg_next::util::frame::video::Video::new(src_format, self.width, self.height);
        let stride = packed.stride(0);
        let row_len = self.width as usize * 3;
        let dst = packed.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_len).enumerate() {
            let dst_start = row * stride;
            dst[dst_start..dst_start + row_len].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler_for(frame.order())?.run(&packed, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_frame(&yuv_frame)?;
        }
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let result = self.finalize();

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        result
    }
}

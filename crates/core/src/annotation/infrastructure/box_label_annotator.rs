use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::{label_baseline, Annotation, FrameAnnotator};
use crate::shared::bounding_box::{BoundingBox, DisplaySpace};
use crate::shared::frame::{ColorOrder, Frame};

use super::bitmap_font::{self, ADVANCE, GLYPH_HEIGHT};

pub const BOX_THICKNESS: u32 = 2;
/// Screen pixels per font pixel; 7-row glyphs come out 14 pixels tall.
pub const FONT_SCALE: u32 = 2;

type FrameCanvas<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

/// Draws a blue rectangle around each face and writes its label in blue
/// above it, or just inside its top edge when the face is near the top of
/// the frame.
///
/// Drawing is clipped to the frame, so boxes hanging off an edge are safe.
pub struct BoxLabelAnnotator {
    thickness: u32,
    font_scale: u32,
}

impl BoxLabelAnnotator {
    pub fn new() -> Self {
        Self {
            thickness: BOX_THICKNESS,
            font_scale: FONT_SCALE,
        }
    }

    fn draw_box(&self, canvas: &mut FrameCanvas<'_>, face: &BoundingBox<DisplaySpace>, color: Rgb<u8>) {
        // Corners are inclusive, so a box spans `width + 1` columns.
        for inset in 0..self.thickness as i32 {
            let w = face.width() + 1 - 2 * inset;
            let h = face.height() + 1 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(face.left + inset, face.top + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }

    fn draw_label(&self, canvas: &mut FrameCanvas<'_>, annotation: &Annotation, color: Rgb<u8>) {
        let scale = self.font_scale;
        let baseline = label_baseline(annotation.face.top);
        let glyph_top = baseline - (GLYPH_HEIGHT * scale) as i32;
        let mut pen_x = annotation.face.left;

        for c in annotation.label.chars() {
            if let Some(glyph) = bitmap_font::glyph(c) {
                for (col, row) in bitmap_font::lit_pixels(&glyph) {
                    let rect = Rect::at(
                        pen_x + (col * scale) as i32,
                        glyph_top + (row * scale) as i32,
                    )
                    .of_size(scale, scale);
                    draw_filled_rect_mut(canvas, rect, color);
                }
            }
            pen_x += (ADVANCE * scale) as i32;
            if pen_x >= canvas.width() as i32 {
                break;
            }
        }
    }
}

impl Default for BoxLabelAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnnotator for BoxLabelAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        annotations: &[Annotation],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if annotations.is_empty() {
            return Ok(());
        }
        let color = blue(frame.order());
        let (width, height) = (frame.width(), frame.height());
        let mut canvas: FrameCanvas<'_> = ImageBuffer::from_raw(width, height, frame.data_mut())
            .ok_or("frame buffer does not match its dimensions")?;

        for annotation in annotations {
            self.draw_box(&mut canvas, &annotation.face, color);
            self.draw_label(&mut canvas, annotation, color);
        }
        Ok(())
    }
}

fn blue(order: ColorOrder) -> Rgb<u8> {
    match order {
        ColorOrder::Rgb => Rgb([0, 0, 255]),
        ColorOrder::Bgr => Rgb([255, 0, 0]),
    }
}

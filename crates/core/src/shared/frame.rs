use ndarray::ArrayView3;

/// Byte order of the three colour channels in a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorOrder {
    Rgb,
    Bgr,
}

/// A single captured frame: contiguous 3-channel bytes in row-major order.
///
/// Capture backends may hand out either channel order; the face locator
/// and every downstream stage expect RGB, so the frame loop converts once
/// with [`Frame::into_rgb`] right after acquisition.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    order: ColorOrder,
    index: usize,
}

const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, order: ColorOrder, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            order,
            index,
        }
    }

    pub fn rgb(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        Self::new(data, width, height, ColorOrder::Rgb, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ColorOrder {
        self.order
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Returns the frame with RGB channel order, swapping R and B if needed.
    pub fn into_rgb(mut self) -> Self {
        if self.order == ColorOrder::Bgr {
            for px in self.data.chunks_exact_mut(CHANNELS) {
                px.swap(0, 2);
            }
            self.order = ColorOrder::Rgb;
        }
        self
    }

    /// Flips the frame left-to-right in place.
    pub fn mirror_horizontal(&mut self) {
        let row_len = self.width as usize * CHANNELS;
        if row_len == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(row_len) {
            let (mut left, mut right) = (0, self.width as usize - 1);
            while left < right {
                for c in 0..CHANNELS {
                    row.swap(left * CHANNELS + c, right * CHANNELS + c);
                }
                left += 1;
                right -= 1;
            }
        }
    }

    /// Returns a copy scaled to `width` pixels wide, preserving aspect ratio.
    ///
    /// The new height is `floor(height * width / self.width)`, never below 1.
    pub fn resize_to_width(&self, width: u32) -> Frame {
        if width == self.width || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let ratio = width as f64 / self.width as f64;
        let height = ((self.height as f64 * ratio) as u32).max(1);

        let resized = match image::RgbImage::from_raw(self.width, self.height, self.data.clone()) {
            Some(img) => {
                image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle)
            }
            None => return self.clone(),
        };

        Frame::new(resized.into_raw(), width, height, self.order, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}

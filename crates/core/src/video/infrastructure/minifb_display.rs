use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::shared::frame::{ColorOrder, Frame};
use crate::video::domain::frame_display::{FrameDisplay, KeyPress};

/// Upper bound on how often the window repaints, which is also the wait
/// applied to each key poll.
const TARGET_FPS: usize = 60;

/// Native window backed by `minifb`.
///
/// The window is created by the first `show`, sized to that frame.
pub struct MinifbDisplay {
    title: String,
    window: Option<Window>,
    buffer: Vec<u32>,
    closed: bool,
}

impl MinifbDisplay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            window: None,
            buffer: Vec::new(),
            closed: false,
        }
    }

    fn window_for(&mut self, frame: &Frame) -> Result<&mut Window, Box<dyn std::error::Error>> {
        if self.window.is_none() {
            let mut window = Window::new(
                &self.title,
                frame.width() as usize,
                frame.height() as usize,
                WindowOptions {
                    resize: true,
                    ..WindowOptions::default()
                },
            )?;
            window.set_target_fps(TARGET_FPS);
            log::debug!(
                "Opened display window {}x{}",
                frame.width(),
                frame.height()
            );
            self.window = Some(window);
        }
        self.window
            .as_mut()
            .ok_or_else(|| "display window unavailable".into())
    }
}

impl FrameDisplay for MinifbDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.closed {
            return Err("display already closed".into());
        }
        let mut buffer = std::mem::take(&mut self.buffer);
        to_argb(frame, &mut buffer);
        let window = self.window_for(frame)?;
        let result =
            window.update_with_buffer(&buffer, frame.width() as usize, frame.height() as usize);
        self.buffer = buffer;
        result.map_err(|e| e.into())
    }

    fn poll_key(&mut self) -> Option<KeyPress> {
        let window = self.window.as_ref()?;
        let keys = window.get_keys_pressed(KeyRepeat::No);
        if keys.contains(&Key::Escape) {
            Some(KeyPress::Escape)
        } else if keys.is_empty() {
            None
        } else {
            Some(KeyPress::Other)
        }
    }

    fn is_open(&self) -> bool {
        !self.closed && self.window.as_ref().map_or(true, Window::is_open)
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            log::debug!("Display window closed");
        }
        self.closed = true;
    }
}

/// Packs a 3-channel frame into minifb's `0RGB` pixels, honoring byte order.
fn to_argb(frame: &Frame, out: &mut Vec<u32>) {
    out.clear();
    out.reserve(frame.width() as usize * frame.height() as usize);
    let (r, b) = match frame.order() {
        ColorOrder::Rgb => (0, 2),
        ColorOrder::Bgr => (2, 0),
    };
    out.extend(frame.data().chunks_exact(3).map(|px| {
        ((px[r] as u32) << 16) | ((px[1] as u32) << 8) | px[b] as u32
    }));
}

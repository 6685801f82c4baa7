//! LED matrix display adapter
//!
//! [`MatrixDisplay`] is the capability the display loop drives. [`Matrix`]
//! implements it on top of a [`ScrollBuffer`] and hands every rendered frame
//! to a [`FrameSink`]: the IS31FL3731 chip on real hardware, or the log.

pub mod buffer;
pub mod console;
pub mod font;
pub mod is31fl3731;

pub use buffer::ScrollBuffer;
pub use console::ConsoleSink;
pub use font::{Font, FONT_5X7};
pub use is31fl3731::Is31fl3731;

use crate::{Result, WedpiError};

/// Scroll pHAT HD panel width in pixels
pub const DISPLAY_WIDTH: usize = 17;

/// Scroll pHAT HD panel height in pixels
pub const DISPLAY_HEIGHT: usize = 7;

/// Panel orientation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Normal,
    /// Rotated by 180 degrees
    UpsideDown,
}

impl Rotation {
    /// Only half turns fit a 17x7 panel
    pub fn from_degrees(degrees: u16) -> Result<Self> {
        match degrees % 360 {
            0 => Ok(Rotation::Normal),
            180 => Ok(Rotation::UpsideDown),
            other => Err(WedpiError::ConfigError(format!(
                "unsupported rotation of {} degrees",
                other
            ))),
        }
    }
}

/// One panel-sized frame of 8-bit pixel levels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pixels: [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
}

impl Frame {
    pub fn blank() -> Self {
        Self {
            pixels: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y][x]
    }

    pub fn set(&mut self, x: usize, y: usize, level: u8) {
        self.pixels[y][x] = level;
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().flatten().all(|&level| level == 0)
    }

    /// Rows of pixel levels, top first
    pub fn rows(&self) -> impl Iterator<Item = &[u8; DISPLAY_WIDTH]> {
        self.pixels.iter()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::blank()
    }
}

/// Destination for rendered frames
pub trait FrameSink {
    /// Push a frame to the output
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        (**self).present(frame)
    }
}

/// Operations the display loop needs from an LED matrix
pub trait MatrixDisplay {
    /// Visible width in pixels
    fn width(&self) -> usize;

    /// Visible height in pixels
    fn height(&self) -> usize;

    /// Blank the buffer and reset scrolling (not shown until [`show`](Self::show))
    fn clear(&mut self);

    /// Push the visible window to the panel
    fn show(&mut self) -> Result<()>;

    /// Move the visible window left by `columns`
    fn scroll(&mut self, columns: usize);

    /// Draw text into the buffer, returns its width in pixels
    fn write_string(&mut self, text: &str, x: usize, y: usize, font: &Font, brightness: f32)
        -> usize;

    /// Set the panel orientation
    fn set_rotation(&mut self, rotation: Rotation);

    /// Set the panel orientation in degrees
    fn rotate(&mut self, degrees: u16) -> Result<()> {
        self.set_rotation(Rotation::from_degrees(degrees)?);
        Ok(())
    }
}

/// A scroll buffer wired to a frame sink
pub struct Matrix<S> {
    buffer: ScrollBuffer,
    sink: S,
}

impl<S: FrameSink> Matrix<S> {
    pub fn new(sink: S) -> Self {
        Self {
            buffer: ScrollBuffer::new(),
            sink,
        }
    }

    pub fn buffer(&self) -> &ScrollBuffer {
        &self.buffer
    }
}

impl<S: FrameSink> MatrixDisplay for Matrix<S> {
    fn width(&self) -> usize {
        DISPLAY_WIDTH
    }

    fn height(&self) -> usize {
        DISPLAY_HEIGHT
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn show(&mut self) -> Result<()> {
        let frame = self.buffer.frame();
        self.sink.present(&frame)
    }

    fn scroll(&mut self, columns: usize) {
        self.buffer.scroll(columns);
    }

    fn write_string(
        &mut self,
        text: &str,
        x: usize,
        y: usize,
        font: &Font,
        brightness: f32,
    ) -> usize {
        self.buffer.write_string(text, x, y, font, brightness)
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.buffer.set_rotation(rotation);
    }
}

/// Show, then scroll one column, `columns` times with a fixed step delay
pub fn scroll_across<D: MatrixDisplay + ?Sized>(
    display: &mut D,
    columns: usize,
    step_delay: std::time::Duration,
) -> Result<()> {
    for _ in 0..columns {
        display.show()?;
        display.scroll(1);
        if !step_delay.is_zero() {
            std::thread::sleep(step_delay);
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Sink that keeps every frame it was given
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub frames: Arc<Mutex<Vec<Frame>>>,
    }

    impl RecordingSink {
        pub fn count(&self) -> usize {
            self.frames.lock().len()
        }
    }

    impl FrameSink for RecordingSink {
        fn present(&mut self, frame: &Frame) -> Result<()> {
            self.frames.lock().push(frame.clone());
            Ok(())
        }
    }
}

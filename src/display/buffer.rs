//! Off-screen pixel buffer with horizontal scrolling
//!
//! Text is drawn into a buffer that grows as needed; the display shows a
//! panel-sized window starting at the scroll offset, wrapping at the end of
//! the buffer.

use super::font::Font;
use super::{Frame, Rotation, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Growable brightness buffer (values 0.0 - 1.0)
#[derive(Debug, Clone)]
pub struct ScrollBuffer {
    /// Pixel columns, each `height` entries tall
    columns: Vec<Vec<f32>>,
    height: usize,
    scroll_x: usize,
    rotation: Rotation,
}

impl ScrollBuffer {
    pub fn new() -> Self {
        Self {
            columns: vec![vec![0.0; DISPLAY_HEIGHT]; DISPLAY_WIDTH],
            height: DISPLAY_HEIGHT,
            scroll_x: 0,
            rotation: Rotation::Normal,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_x
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Reset to a blank, display-sized buffer at offset zero
    pub fn clear(&mut self) {
        self.columns.clear();
        self.columns
            .resize(DISPLAY_WIDTH, vec![0.0; DISPLAY_HEIGHT]);
        self.height = DISPLAY_HEIGHT;
        self.scroll_x = 0;
    }

    /// Brightness at a buffer position, zero outside the buffer
    pub fn pixel(&self, x: usize, y: usize) -> f32 {
        self.columns
            .get(x)
            .and_then(|column| column.get(y))
            .copied()
            .unwrap_or(0.0)
    }

    /// Set one pixel, growing the buffer to fit
    pub fn set_pixel(&mut self, x: usize, y: usize, brightness: f32) {
        self.ensure_size(x + 1, y + 1);
        self.columns[x][y] = brightness.clamp(0.0, 1.0);
    }

    /// Draw text with its top-left corner at (x, y)
    ///
    /// Returns the number of columns the text occupies.
    pub fn write_string(
        &mut self,
        text: &str,
        x: usize,
        y: usize,
        font: &Font,
        brightness: f32,
    ) -> usize {
        let mut cursor = x;

        for c in text.chars() {
            let glyph = font.glyph(c);
            for (dx, bits) in glyph.iter().take(font.width).enumerate() {
                for dy in 0..font.height {
                    let lit = (bits >> dy) & 1 == 1;
                    self.set_pixel(cursor + dx, y + dy, if lit { brightness } else { 0.0 });
                }
            }
            cursor += font.advance();
        }

        // Trailing spacing is part of the scrollable area
        self.ensure_size(cursor, y + font.height);
        cursor - x
    }

    /// Shift the visible window left by `columns`, wrapping at the buffer end
    pub fn scroll(&mut self, columns: usize) {
        let width = self.width();
        if width > 0 {
            self.scroll_x = (self.scroll_x + columns) % width;
        }
    }

    /// Render the visible window as 8-bit levels, rotation applied
    pub fn frame(&self) -> Frame {
        let mut frame = Frame::blank();
        let width = self.width();

        for dy in 0..DISPLAY_HEIGHT {
            for dx in 0..DISPLAY_WIDTH {
                let value = self.pixel((self.scroll_x + dx) % width, dy);
                let level = (value * 255.0).round() as u8;

                let (px, py) = match self.rotation {
                    Rotation::Normal => (dx, dy),
                    Rotation::UpsideDown => (DISPLAY_WIDTH - 1 - dx, DISPLAY_HEIGHT - 1 - dy),
                };
                frame.set(px, py, level);
            }
        }

        frame
    }

    fn ensure_size(&mut self, width: usize, height: usize) {
        if height > self.height {
            for column in self.columns.iter_mut() {
                column.resize(height, 0.0);
            }
            self.height = height;
        }
        if width > self.columns.len() {
            let blank = vec![0.0; self.height];
            self.columns.resize(width, blank);
        }
    }
}

impl Default for ScrollBuffer {
    fn default() -> Self {
        Self::new()
    }
}

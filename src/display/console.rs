//! Frame sink that draws frames into the log
//!
//! Used when no matrix is attached. Frames are logged at trace level under
//! the `wedpi::display::frames` target so they can be enabled on their own.

use super::{Frame, FrameSink};
use crate::Result;
use tracing::trace;

#[derive(Debug, Default)]
pub struct ConsoleSink {
    frames_presented: u64,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

/// ASCII art of a frame, one line per row
pub fn render_ascii(frame: &Frame) -> String {
    frame
        .rows()
        .map(|row| {
            row.iter()
                .map(|&level| match level {
                    0 => '.',
                    1..=127 => '+',
                    _ => '#',
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl FrameSink for ConsoleSink {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.frames_presented += 1;
        trace!(
            target: "wedpi::display::frames",
            "frame {}\n{}",
            self.frames_presented,
            render_ascii(frame)
        );
        Ok(())
    }
}

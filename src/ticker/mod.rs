//! Display loop
//!
//! Takes one message at a time from the queue, scrolls it across the panel
//! and puts it back at the tail, so queued messages rotate forever.

pub mod boot;
pub mod context;

pub use boot::{BootAnnouncer, HostInfo};
pub use context::TickerContext;

use crate::display::{scroll_across, MatrixDisplay, DISPLAY_HEIGHT, FONT_5X7};
use crate::messages::Message;
use crate::Result;
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Row the measuring copy of a message is drawn at, just below the panel
pub const MEASURE_ROW: usize = DISPLAY_HEIGHT;

/// Commands accepted by [`Ticker::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerCommand {
    Shutdown,
}

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A message was scrolled; carries its width in columns
    Displayed(usize),
    /// Nothing queued
    Empty,
    /// The queue was reset to the default messages; carries how many
    Reset(usize),
}

pub struct Ticker<D> {
    display: D,
    ctx: Arc<TickerContext>,
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

impl<D: MatrixDisplay> Ticker<D> {
    pub fn new(display: D, ctx: Arc<TickerContext>) -> Self {
        Self { display, ctx }
    }

    pub fn context(&self) -> &Arc<TickerContext> {
        &self.ctx
    }

    /// Orient the panel, announce the host and seed the queue
    pub fn boot(&mut self) -> Result<()> {
        self.display.set_rotation(self.ctx.config().display.rotation);

        if let Err(e) = BootAnnouncer::new(&self.ctx).announce(&mut self.display) {
            warn!("Boot announcement failed: {}", e);
        }

        self.seed_queue()?;

        self.display.clear();
        self.display.show()
    }

    fn seed_queue(&self) -> Result<usize> {
        let seeded = self
            .ctx
            .queue()
            .reset_with(&self.ctx.config().default_messages)?;
        info!("Queue seeded with {} default messages", seeded);
        Ok(seeded)
    }

    /// Dequeue and show one message, or wait if there is none
    pub fn step(&mut self) -> Result<Tick> {
        self.display.clear();

        let Some(message) = self.ctx.queue().try_dequeue() else {
            pause(self.ctx.config().timing.empty_wait);
            return Ok(Tick::Empty);
        };

        if self.ctx.config().clear_command && message.is_clear_command() {
            info!("Clear command received");
            self.ctx.queue().task_done()?;
            let seeded = self.seed_queue()?;
            return Ok(Tick::Reset(seeded));
        }

        // Requeue even when the display fails so the message is not lost
        let shown = self.present(&message);
        self.ctx.queue().task_done()?;
        self.ctx.queue().enqueue(message);
        debug!("{} messages pending", self.ctx.queue().size());

        shown.map(Tick::Displayed)
    }

    fn present(&mut self, message: &Message) -> Result<usize> {
        let config = self.ctx.config();
        let brightness = config.display.brightness;

        info!("Displaying {:?}", message.text());
        self.display
            .write_string(message.as_str(), 0, MEASURE_ROW, &FONT_5X7, brightness);
        let length = self
            .display
            .write_string(message.as_str(), 0, 0, &FONT_5X7, brightness);

        pause(config.timing.pre_scroll_pause);
        scroll_across(&mut self.display, length, config.timing.message_scroll_delay)?;

        self.display.clear();
        self.display.show()?;
        pause(config.timing.post_scroll_pause);

        Ok(length)
    }

    /// Run [`step`](Self::step) until told to stop
    pub fn run(&mut self, commands: &Receiver<TickerCommand>) {
        info!("Display loop started");

        loop {
            match commands.try_recv() {
                Ok(TickerCommand::Shutdown) => {
                    info!("Display loop shutdown requested");
                    break;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    warn!("Command channel disconnected");
                    break;
                }
            }

            if let Err(e) = self.step() {
                error!("Display step failed: {}", e);
                pause(self.ctx.config().timing.empty_wait);
            }
        }

        self.display.clear();
        if let Err(e) = self.display.show() {
            warn!("Failed to blank the display: {}", e);
        }
        info!("Display loop stopped");
    }
}

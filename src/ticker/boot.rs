//! One-time startup announcement
//!
//! Scrolls the host name and wireless network across the panel so the
//! board can be found on the network without a screen.

use super::TickerContext;
use crate::display::{font::FONT_5X7, scroll_across, MatrixDisplay};
use crate::network;
use crate::Result;
use std::thread;
use tracing::{info, warn};

/// Shown in place of a name that could not be looked up
pub const OFFLINE: &str = "OFFLINE";

/// Where the board is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub host: String,
    pub network: String,
}

impl HostInfo {
    /// Look up the hostname and ESSID, substituting [`OFFLINE`] on failure
    pub fn lookup() -> Self {
        let host = network::hostname().unwrap_or_else(|e| {
            warn!("Hostname lookup failed: {}", e);
            OFFLINE.to_string()
        });
        let network = network::wireless_network().unwrap_or_else(|e| {
            warn!("Wireless network lookup failed: {}", e);
            OFFLINE.to_string()
        });
        Self { host, network }
    }

    /// Text scrolled at boot
    pub fn banner(&self) -> String {
        format!(
            "  ::: HOST >>> {} :::  WIFI >>> {} :::    ",
            self.host, self.network
        )
    }
}

pub struct BootAnnouncer<'a> {
    ctx: &'a TickerContext,
}

impl<'a> BootAnnouncer<'a> {
    pub fn new(ctx: &'a TickerContext) -> Self {
        Self { ctx }
    }

    /// Announce with a live host lookup; does nothing after the first call
    pub fn announce<D: MatrixDisplay + ?Sized>(&self, display: &mut D) -> Result<bool> {
        if self.ctx.is_booted() {
            return Ok(false);
        }
        self.announce_with(display, &HostInfo::lookup())
    }

    /// Announce the given host details; returns whether anything was shown
    pub fn announce_with<D: MatrixDisplay + ?Sized>(
        &self,
        display: &mut D,
        host: &HostInfo,
    ) -> Result<bool> {
        if !self.ctx.mark_booted() {
            return Ok(false);
        }

        let config = self.ctx.config();
        info!("==============================");
        info!(
            "WedPi starting at {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        info!("Host: {}", host.host);
        info!("Network: {}", host.network);
        info!("Tracking: {}", config.stream.hashtag);
        info!("==============================");

        display.clear();
        let length = display.write_string(
            &host.banner(),
            0,
            0,
            &FONT_5X7,
            config.display.brightness,
        );
        let columns = length.saturating_sub(display.width());
        scroll_across(display, columns, config.timing.boot_scroll_delay)?;

        if !config.timing.boot_pause.is_zero() {
            thread::sleep(config.timing.boot_pause);
        }
        Ok(true)
    }
}

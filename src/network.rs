//! Host identity lookups
//!
//! Hostname and the wireless network the board is associated with, both
//! read through the usual shell utilities.

use crate::{Result, WedpiError};
use std::process::Command;
use tracing::debug;

/// Run a command and return its trimmed stdout
fn command_output(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| WedpiError::NetworkError(format!("failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(WedpiError::NetworkError(format!(
            "{} exited with {}",
            program, output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// The machine's hostname, uppercased for the display
pub fn hostname() -> Result<String> {
    let name = command_output("hostname", &[])?;
    if name.is_empty() {
        return Err(WedpiError::NetworkError("empty hostname".to_string()));
    }
    Ok(name.to_uppercase())
}

/// Name of the currently associated wireless network (via `iwgetid`)
pub fn wireless_network() -> Result<String> {
    let output = command_output("iwgetid", &[])?;
    debug!("iwgetid: {}", output);
    parse_essid(&output)
}

/// Extract the network name from `iwgetid` output
///
/// `wlan0     ESSID:"Home Network"` yields `Home Network`.
pub fn parse_essid(output: &str) -> Result<String> {
    let (_, rest) = output
        .split_once("ESSID:")
        .ok_or_else(|| WedpiError::NetworkError(format!("no ESSID in {:?}", output)))?;

    let essid = rest.trim().trim_matches('"').to_string();
    if essid.is_empty() {
        return Err(WedpiError::NetworkError("not associated".to_string()));
    }
    Ok(essid)
}

//! Serial port discovery and auto-selection
//!
//! A profile carries a free-text port hint ("CH9102", "USB JTAG", ...); the
//! matcher scores every detected port's description against the hint's
//! keywords and picks the best nonzero score. A wrong port can flash the
//! wrong device, so when nothing matches we never guess: interactively the
//! user is asked, otherwise the flash is refused.

use std::io::{stdin, IsTerminal};

use dialoguer::{theme::ColorfulTheme, Select};
use log::info;
use serialport::{available_ports, SerialPortType};

use crate::error::Error;

/// A detected serial port, rebuilt on every scan
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// OS port path or identifier (`COM5`, `/dev/ttyUSB0`, ...)
    pub device: String,
    /// Human-readable description reported by the OS
    pub description: String,
}

/// Scans the system for serial ports. The result is never cached; callers
/// re-scan whenever the selection could be stale.
pub fn serial_port_list() -> Vec<PortInfo> {
    let ports = available_ports().unwrap_or_default();

    ports
        .into_iter()
        .map(|port| {
            let description = match &port.port_type {
                SerialPortType::UsbPort(usb) => usb
                    .product
                    .clone()
                    .unwrap_or_else(|| "Unknown device".to_string()),
                SerialPortType::BluetoothPort => "Bluetooth device".to_string(),
                SerialPortType::PciPort => "PCI device".to_string(),
                SerialPortType::Unknown => "Unknown device".to_string(),
            };

            PortInfo {
                device: port.port_name,
                description,
            }
        })
        .collect()
}

/// Scores every port description against the whitespace-separated keywords
/// of `hint` and returns the index of the best match. A port's score is the
/// number of keywords appearing as substrings of its lowercased description;
/// only a strictly greater score replaces the current best, so ties keep the
/// earliest port. An empty hint, or a best score of zero, yields `None`.
pub fn best_match(ports: &[PortInfo], hint: &str) -> Option<usize> {
    let keywords: Vec<String> = hint.split_whitespace().map(str::to_lowercase).collect();
    if keywords.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize)> = None;
    for (index, port) in ports.iter().enumerate() {
        let description = port.description.to_lowercase();
        let score = keywords
            .iter()
            .filter(|keyword| description.contains(keyword.as_str()))
            .count();
        if score > 0 && best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index)
}

/// Resolves the port to flash through: an explicit `--port` wins, then the
/// profile's hint, then an interactive prompt when a terminal is attached.
pub fn resolve_port(explicit: Option<&str>, hint: &str) -> Result<String, Error> {
    let ports = serial_port_list();

    if let Some(device) = explicit {
        return find_port(&ports, device);
    }

    if ports.is_empty() {
        return Err(Error::NoSerial);
    }

    if let Some(index) = best_match(&ports, hint) {
        let port = &ports[index];
        info!("auto-selected {} ({})", port.device, port.description);
        return Ok(port.device.clone());
    }

    if stdin().is_terminal() {
        select_port(&ports)
    } else {
        Err(Error::NoPortMatch)
    }
}

/// Validates an explicitly named port against the scan, so typos fail before
/// anything is spawned.
fn find_port(ports: &[PortInfo], device: &str) -> Result<String, Error> {
    ports
        .iter()
        .find(|port| port.device.eq_ignore_ascii_case(device))
        .map(|port| port.device.clone())
        .ok_or_else(|| Error::SerialNotFound(device.to_string()))
}

fn select_port(ports: &[PortInfo]) -> Result<String, Error> {
    let items: Vec<String> = ports
        .iter()
        .map(|port| format!("{} - {}", port.device, port.description))
        .collect();

    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a serial port")
        .items(&items)
        .default(0)
        .interact_opt()?
        .ok_or(Error::Cancelled)?;

    Ok(ports[index].device.clone())
}

//! Serial firmware uploader built around external flashing tools.
//!
//! The actual flashing protocols are owned by `esptool` (ESP32 family) and
//! `avrdude` (AVR/Arduino boards); this crate resolves device project
//! profiles, picks the most likely serial port from a profile's hint,
//! constructs the tool's command line and streams the tool's output while it
//! runs.

pub mod cli;
pub mod logging;

mod command;
mod error;
mod profile;
mod runner;
mod version;

pub use command::build_command;
pub use error::Error;
pub use profile::{DeviceProfile, ProfileSet, Tool};
pub use runner::{FlashEvent, FlashHandle, FlashJob, FlashRunner};
pub use version::resolved_version;

//! Library and application errors

use std::io;

use miette::Diagnostic;
use strum::VariantNames;
use thiserror::Error;

use crate::profile::Tool;

/// All possible errors returned by fwuploader
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Operation was cancelled by the user")]
    #[diagnostic(code(fwuploader::cancelled))]
    Cancelled,

    #[error("Failed to parse the project configuration file: {0}")]
    #[diagnostic(
        code(fwuploader::config_parse),
        help("Each project is a table of `chip`, `tool` ({}), `baud` and either `address` or `programmer`.\n\
              Run `fwuploader export-sample-config` for a template.",
             Tool::VARIANTS.join(", "))
    )]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),

    #[error("Firmware file '{}' does not exist", .0.display())]
    #[diagnostic(code(fwuploader::firmware_not_found))]
    FirmwareNotFound(std::path::PathBuf),

    #[error("Flash failed (exit code: {0})")]
    #[diagnostic(
        code(fwuploader::flash_failed),
        help("Check the tool output above. Common causes are a wrong port, a device not in bootloader mode, or a bad USB cable.")
    )]
    FlashFailed(i32),

    #[error("A flash operation is already in progress")]
    #[diagnostic(code(fwuploader::flash_in_progress))]
    FlashInProgress,

    #[error("The selected {tool} profile is missing `{missing}`")]
    #[diagnostic(code(fwuploader::incomplete_profile))]
    IncompleteProfile { tool: Tool, missing: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("No serial port matched the project's port hint")]
    #[diagnostic(
        code(fwuploader::no_port_match),
        help("Pass `--port` explicitly; `fwuploader ports` lists the detected ports")
    )]
    NoPortMatch,

    #[error("No serial ports could be detected")]
    #[diagnostic(
        code(fwuploader::no_serial),
        help("Make sure the device is connected to the host system and its USB driver is installed")
    )]
    NoSerial,

    #[error("The serial port '{0}' could not be found")]
    #[diagnostic(
        code(fwuploader::serial_not_found),
        help("Make sure the correct device is connected to the host system")
    )]
    SerialNotFound(String),

    #[error("The flashing tool '{0}' could not be found")]
    #[diagnostic(
        code(fwuploader::tool_not_found),
        help("Install the tool, add it to PATH, or place it in the `tools` directory next to the executable")
    )]
    ToolNotFound(String),

    #[error("Unknown project: {0}")]
    #[diagnostic(
        code(fwuploader::unknown_project),
        help("Run `fwuploader projects --advanced` to list the available projects")
    )]
    UnknownProfile(String),
}

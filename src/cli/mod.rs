//! Subcommand implementations for the fwuploader binary

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use miette::{IntoDiagnostic, Result, WrapErr};

use crate::{
    command::build_command,
    error::Error,
    profile::{DeviceProfile, ProfileSet},
    runner::{FlashEvent, FlashJob, FlashRunner},
};

pub mod serial;

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Path to a user project configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FlashArgs {
    /// Name of the project profile to flash
    pub project: String,

    /// Firmware image to write (.bin for esptool, .hex for avrdude)
    pub firmware: PathBuf,

    /// Serial port connected to the target device; auto-selected from the
    /// project's port hint when omitted
    #[arg(short, long)]
    pub port: Option<String>,

    #[command(flatten)]
    pub profile_args: ProfileArgs,
}

#[derive(Debug, Args)]
pub struct ProjectsArgs {
    /// Also list the built-in advanced/generic board profiles
    #[arg(long)]
    pub advanced: bool,

    #[command(flatten)]
    pub profile_args: ProfileArgs,
}

#[derive(Debug, Args)]
pub struct ExportSampleConfigArgs {
    /// Where to write the sample configuration
    #[arg(default_value = "projects_sample.toml")]
    pub path: PathBuf,
}

/// Flashes a firmware image using the named project profile.
pub fn flash(args: FlashArgs) -> Result<()> {
    let profiles = ProfileSet::load(args.profile_args.config.as_deref());
    let profile = profiles.get(&args.project)?;

    // All inputs are validated before anything is spawned.
    if !args.firmware.is_file() {
        return Err(Error::FirmwareNotFound(args.firmware).into());
    }
    let port = serial::resolve_port(args.port.as_deref(), &profile.port_hint)?;

    let firmware = args.firmware.to_string_lossy();
    let command = build_command(profile, &port, &firmware)?;

    print_banner(&args.project, profile, &args.firmware, &port);
    println!("Command: {}\n", command.join(" "));

    let runner = FlashRunner::new();
    let handle = runner.spawn(FlashJob { command })?;

    // Drain the worker on this thread so output lines appear exactly in the
    // order they were produced.
    for event in handle.events {
        match event {
            FlashEvent::Line(line) => println!("{line}"),
            FlashEvent::SpawnFailed(e) => return Err(e.into()),
            FlashEvent::Exited(0) => {
                println!("\nFlash complete!");
                return Ok(());
            }
            FlashEvent::Exited(code) => return Err(Error::FlashFailed(code).into()),
        }
    }

    Ok(())
}

fn print_banner(project: &str, profile: &DeviceProfile, firmware: &Path, port: &str) {
    let firmware = firmware
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| firmware.display().to_string());

    println!("{}", "=".repeat(60));
    println!("Project:  {project}");
    println!("Device:   {}", profile.chip);
    println!("Tool:     {}", profile.tool);
    println!("Firmware: {firmware}");
    println!("Port:     {port}");
    println!("{}\n", "=".repeat(60));
}

/// Lists the available project profiles.
pub fn projects(args: ProjectsArgs) -> Result<()> {
    let profiles = ProfileSet::load(args.profile_args.config.as_deref());
    let names = profiles.names(args.advanced);

    if names.is_empty() {
        println!("No user projects configured. Pass `--advanced` to list the built-in boards.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Project", "Chip", "Tool", "Baud", "Port hint"]);

    for name in names {
        let profile = profiles.get(name)?;
        table.add_row([
            name.to_string(),
            profile.chip.clone(),
            profile.tool.to_string(),
            profile.baud.to_string(),
            profile.port_hint.clone(),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Lists the serial ports detected on this system.
pub fn ports() -> Result<()> {
    let ports = serial::serial_port_list();

    if ports.is_empty() {
        println!("No serial ports found. Connect a device or install its USB driver, then retry.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Port", "Description"]);

    for port in ports {
        table.add_row([port.device, port.description]);
    }

    println!("{table}");
    Ok(())
}

/// Writes a sample project configuration file for the user to copy and
/// extend.
pub fn export_sample_config(args: ExportSampleConfigArgs) -> Result<()> {
    let serialized = toml::to_string_pretty(&ProfileSet::sample_profiles())
        .into_diagnostic()
        .wrap_err("Failed to serialize the sample configuration")?;

    fs::write(&args.path, serialized)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", args.path.display()))?;

    println!("Sample configuration written to {}", args.path.display());
    Ok(())
}

use clap::{Parser, Subcommand};
use fwuploader::{
    cli::{
        export_sample_config, flash, ports, projects, ExportSampleConfigArgs, FlashArgs,
        ProjectsArgs,
    },
    logging::initialize_logger,
    resolved_version,
};
use log::{debug, LevelFilter};
use miette::Result;

#[derive(Debug, Parser)]
#[command(about, propagate_version = true, version = resolved_version())]
struct Cli {
    #[command(subcommand)]
    subcommand: Commands,

    /// Log level
    #[arg(long, global = true, default_value = "info", env = "FWUPLOADER_LOG")]
    log_level: LevelFilter,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a firmware image to a device using its project profile
    Flash(FlashArgs),
    /// List the available project profiles
    Projects(ProjectsArgs),
    /// List the serial ports detected on this system
    Ports,
    /// Write a sample project configuration file to copy and extend
    ExportSampleConfig(ExportSampleConfigArgs),
}

fn main() -> Result<()> {
    miette::set_panic_hook();

    // Attempt to parse any provided command-line arguments, or print the help
    // message and terminate if the invocation is not correct.
    let args = Cli::parse();
    initialize_logger(args.log_level);
    debug!("{:#?}", args);

    // Execute the correct action based on the provided subcommand and its
    // associated arguments.
    match args.subcommand {
        Commands::Flash(args) => flash(args),
        Commands::Projects(args) => projects(args),
        Commands::Ports => ports(),
        Commands::ExportSampleConfig(args) => export_sample_config(args),
    }
}

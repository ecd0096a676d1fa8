//! Logging for the fwuploader binary

use std::io::Write as _;

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initializes the logger with the given filter level, which `RUST_LOG` may
/// still override.
pub fn initialize_logger(filter: LevelFilter) {
    Builder::from_env(Env::default().default_filter_or(filter.as_str()))
        .format(|f, record| {
            let style = f.default_level_style(record.level());
            writeln!(f, "[{style}{}{style:#}] {}", record.level(), record.args())
        })
        .init();
}

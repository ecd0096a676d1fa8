//! Version string resolution
//!
//! Release packaging drops a `_version.txt` marker next to the executable;
//! the environment variable lets wrapper scripts override the label. The
//! crate version is the fallback for plain `cargo install` builds.

use std::{env, fs, sync::OnceLock};

const VERSION_ENV: &str = "FWUPLOADER_VERSION";
const VERSION_MARKER: &str = "_version.txt";

/// The displayed version string, resolved once per process.
pub fn resolved_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| resolve(env::var(VERSION_ENV).ok(), read_version_marker()))
}

fn resolve(env_value: Option<String>, marker: Option<String>) -> String {
    for candidate in [env_value, marker].into_iter().flatten() {
        let candidate = candidate.trim();
        if !candidate.is_empty() {
            return candidate.to_string();
        }
    }
    env!("CARGO_PKG_VERSION").to_string()
}

fn read_version_marker() -> Option<String> {
    let exe = env::current_exe().ok()?;
    fs::read_to_string(exe.parent()?.join(VERSION_MARKER)).ok()
}

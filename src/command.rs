//! External tool command construction
//!
//! Produces the exact argument vector handed to `esptool` or `avrdude`. The
//! executable is resolved against a bundled `tools` directory first, then the
//! system search path; when nothing resolves the bare tool name is returned
//! on purpose, so the failure surfaces at launch time with an actionable
//! "tool not found" message instead of being pre-validated here.

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{
    error::Error,
    profile::{DeviceProfile, Tool},
};

/// Builds the full argv for flashing `firmware` to the device on `port`.
pub fn build_command(
    profile: &DeviceProfile,
    port: &str,
    firmware: &str,
) -> Result<Vec<String>, Error> {
    let baud = profile.baud.to_string();

    match profile.tool {
        Tool::Esptool => {
            let address = profile.address.as_deref().ok_or(Error::IncompleteProfile {
                tool: Tool::Esptool,
                missing: "address",
            })?;

            let mut command = resolve_esptool();
            command.extend([
                "--chip".into(),
                profile.chip.clone(),
                "--baud".into(),
                baud,
                "--port".into(),
                port.into(),
                "write-flash".into(),
                address.into(),
                firmware.into(),
            ]);
            Ok(command)
        }
        Tool::Avrdude => {
            let programmer = profile
                .programmer
                .as_deref()
                .ok_or(Error::IncompleteProfile {
                    tool: Tool::Avrdude,
                    missing: "programmer",
                })?;

            let mut command = vec![resolve_tool("avrdude")];
            // The bundled avrdude has no baked-in config search path.
            if let Some(conf) = bundled_file("avrdude.conf") {
                command.push("-C".into());
                command.push(conf.display().to_string());
            }
            command.extend([
                "-c".into(),
                programmer.into(),
                "-p".into(),
                profile.chip.clone(),
                "-P".into(),
                port.into(),
                "-b".into(),
                baud,
                "-D".into(),
                "-U".into(),
                format!("flash:w:{firmware}:i"),
            ]);
            Ok(command)
        }
    }
}

/// esptool is frequently installed as a Python module only, so after the
/// bundled and PATH lookups fall through, try running it through an
/// interpreter.
fn resolve_esptool() -> Vec<String> {
    if let Some(bundled) = bundled_file(&exe_name("esptool")) {
        return vec![bundled.display().to_string()];
    }
    if let Some(found) = find_in_path("esptool") {
        return vec![found.display().to_string()];
    }
    for python in ["python3", "python"] {
        if let Some(python) = find_in_path(python) {
            return vec![python.display().to_string(), "-m".into(), "esptool".into()];
        }
    }
    vec!["esptool".into()]
}

fn resolve_tool(name: &str) -> String {
    if let Some(bundled) = bundled_file(&exe_name(name)) {
        return bundled.display().to_string();
    }
    if let Some(found) = find_in_path(name) {
        return found.display().to_string();
    }
    name.to_string()
}

fn exe_name(name: &str) -> String {
    format!("{name}{}", env::consts::EXE_SUFFIX)
}

/// Looks for `file` in the `tools` directory shipped alongside the
/// executable.
fn bundled_file(file: &str) -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    bundled_file_in(exe.parent()?, file)
}

fn bundled_file_in(dir: &Path, file: &str) -> Option<PathBuf> {
    let candidate = dir.join("tools").join(file);
    candidate.exists().then_some(candidate)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let file = exe_name(name);
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(&file))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{DeviceProfile, Tool};

    fn esp32_generic() -> DeviceProfile {
        DeviceProfile {
            chip: "esp32".into(),
            tool: Tool::Esptool,
            baud: 460_800,
            address: Some("0x10000".into()),
            programmer: None,
            port_hint: "CH9102".into(),
        }
    }

    fn arduino_nano() -> DeviceProfile {
        DeviceProfile {
            chip: "atmega328p".into(),
            tool: Tool::Avrdude,
            baud: 57_600,
            address: None,
            programmer: Some("arduino".into()),
            port_hint: "CH340".into(),
        }
    }

    fn flag_value<'a>(argv: &'a [String], flag: &str) -> &'a str {
        let at = argv
            .iter()
            .position(|arg| arg == flag)
            .unwrap_or_else(|| panic!("{flag} not found in {argv:?}"));
        &argv[at + 1]
    }

    #[test]
    fn esptool_command_shape() {
        let argv = build_command(&esp32_generic(), "COM5", "app.bin").unwrap();

        let tail = ["write-flash", "0x10000", "app.bin"].map(String::from);
        assert!(argv.ends_with(&tail), "unexpected argv: {argv:?}");
        assert_eq!(flag_value(&argv, "--port"), "COM5");
        assert_eq!(flag_value(&argv, "--baud"), "460800");
        assert_eq!(flag_value(&argv, "--chip"), "esp32");
    }

    #[test]
    fn avrdude_command_shape() {
        let argv = build_command(&arduino_nano(), "/dev/ttyUSB0", "app.hex").unwrap();

        assert_eq!(flag_value(&argv, "-U"), "flash:w:app.hex:i");
        assert_eq!(flag_value(&argv, "-P"), "/dev/ttyUSB0");
        assert_eq!(flag_value(&argv, "-p"), "atmega328p");
        assert_eq!(flag_value(&argv, "-c"), "arduino");
        assert_eq!(flag_value(&argv, "-b"), "57600");
        assert!(argv.contains(&"-D".to_string()));
    }

    #[test]
    fn incomplete_profiles_are_rejected_before_spawning() {
        let mut esp = esp32_generic();
        esp.address = None;
        assert!(matches!(
            build_command(&esp, "COM5", "app.bin"),
            Err(Error::IncompleteProfile {
                missing: "address",
                ..
            })
        ));

        let mut nano = arduino_nano();
        nano.programmer = None;
        assert!(matches!(
            build_command(&nano, "/dev/ttyUSB0", "app.hex"),
            Err(Error::IncompleteProfile {
                missing: "programmer",
                ..
            })
        ));
    }

    #[test]
    fn bundled_lookup_finds_only_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(bundled_file_in(dir.path(), "avrdude.conf"), None);

        let tools = dir.path().join("tools");
        std::fs::create_dir(&tools).unwrap();
        std::fs::write(tools.join("avrdude.conf"), "# conf").unwrap();
        assert_eq!(
            bundled_file_in(dir.path(), "avrdude.conf"),
            Some(tools.join("avrdude.conf"))
        );
    }
}

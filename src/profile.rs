//! Device project profiles
//!
//! A profile names one flashable target and carries everything needed to
//! build the external tool's command line. The built-in table covers the
//! boards we ship hardware for; users can overlay their own profiles from a
//! `projects.toml` file, which replaces built-ins of the same name whole.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// The external tool a profile is flashed with
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tool {
    /// `esptool`, for the ESP32 family
    Esptool,
    /// `avrdude`, for AVR/Arduino boards
    Avrdude,
}

/// Flashing parameters for a single target device
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceProfile {
    /// Chip identifier passed to the tool (e.g. `esp32`, `atmega328p`)
    pub chip: String,
    /// Tool used to perform the flash
    pub tool: Tool,
    /// Baud rate for the serial connection
    #[serde(deserialize_with = "deserialize_baud")]
    pub baud: u32,
    /// Flash address, required for esptool profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Programmer id, required for avrdude profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programmer: Option<String>,
    /// Keywords matched against serial port descriptions during
    /// auto-selection
    #[serde(default)]
    pub port_hint: String,
}

/// Earlier releases stored the baud rate as a string, so both forms are
/// accepted.
fn deserialize_baud<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Baud {
        Int(u32),
        Str(String),
    }

    match Baud::deserialize(deserializer)? {
        Baud::Int(baud) => Ok(baud),
        Baud::Str(baud) => baud.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl DeviceProfile {
    fn esptool(chip: &str, baud: u32, address: &str, port_hint: &str) -> Self {
        DeviceProfile {
            chip: chip.into(),
            tool: Tool::Esptool,
            baud,
            address: Some(address.into()),
            programmer: None,
            port_hint: port_hint.into(),
        }
    }

    fn avrdude(chip: &str, baud: u32, programmer: &str, port_hint: &str) -> Self {
        DeviceProfile {
            chip: chip.into(),
            tool: Tool::Avrdude,
            baud,
            address: None,
            programmer: Some(programmer.into()),
            port_hint: port_hint.into(),
        }
    }

    /// Checks the per-tool field requirements. Returns the name of the
    /// missing field.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self.tool {
            Tool::Esptool if self.address.is_none() => Err("address"),
            Tool::Avrdude if self.programmer.is_none() => Err("programmer"),
            _ => Ok(()),
        }
    }
}

/// Boards supported out of the box. Hidden behind the `--advanced` flag when
/// user profiles exist, since technicians normally flash a named project.
fn builtin_profiles() -> Vec<(&'static str, DeviceProfile)> {
    vec![
        (
            "ESP32 - Generic",
            DeviceProfile::esptool("esp32", 460_800, "0x10000", "CH9102"),
        ),
        (
            "ESP32-S3",
            DeviceProfile::esptool("esp32s3", 460_800, "0x10000", "USB JTAG"),
        ),
        (
            "ESP32-C3",
            DeviceProfile::esptool("esp32c3", 460_800, "0x0", "USB JTAG"),
        ),
        (
            "Olimex ESP32-POE-ISO",
            DeviceProfile::esptool("esp32", 460_800, "0x10000", "CH340 or FT232"),
        ),
        (
            "Arduino Uno",
            DeviceProfile::avrdude("atmega328p", 115_200, "arduino", "Arduino Uno"),
        ),
        (
            "Arduino Nano",
            DeviceProfile::avrdude("atmega328p", 57_600, "arduino", "CH340"),
        ),
        (
            "Arduino Nano (Old Bootloader)",
            DeviceProfile::avrdude("atmega328p", 57_600, "arduino", "FT232"),
        ),
    ]
}

/// The merged, immutable-after-load set of device profiles
#[derive(Debug)]
pub struct ProfileSet {
    profiles: BTreeMap<String, DeviceProfile>,
    /// User-supplied profile names, shown by default
    primary: Vec<String>,
    /// Built-in profile names not overridden by a user profile
    advanced: Vec<String>,
}

impl ProfileSet {
    /// Builds the profile set from the built-in table, overlaid with the user
    /// configuration file if one is found. A missing file is normal; an
    /// unreadable or malformed file is a warning and the built-ins are used
    /// as-is.
    pub fn load(user_file: Option<&Path>) -> Self {
        let mut profiles = BTreeMap::new();
        let mut advanced = Vec::new();
        for (name, profile) in builtin_profiles() {
            advanced.push(name.to_string());
            profiles.insert(name.to_string(), profile);
        }

        let mut primary = Vec::new();
        let path = user_file.map(Path::to_path_buf).or_else(find_user_config);
        if let Some(path) = path {
            match load_user_profiles(&path) {
                Ok(user) => {
                    debug!(
                        "loaded {} user profile(s) from {}",
                        user.len(),
                        path.display()
                    );
                    for (name, profile) in user {
                        advanced.retain(|builtin| builtin != &name);
                        primary.push(name.clone());
                        profiles.insert(name, profile);
                    }
                }
                Err(e) => warn!("could not load {}: {e}", path.display()),
            }
        }

        ProfileSet {
            profiles,
            primary,
            advanced,
        }
    }

    /// Looks up a profile by display name.
    pub fn get(&self, name: &str) -> Result<&DeviceProfile, Error> {
        self.profiles
            .get(name)
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))
    }

    /// Profile names in display order: user profiles first, built-in boards
    /// appended when `include_advanced` is set.
    pub fn names(&self, include_advanced: bool) -> Vec<&str> {
        let mut names: Vec<&str> = self.primary.iter().map(String::as_str).collect();
        if include_advanced {
            names.extend(self.advanced.iter().map(String::as_str));
        }
        names
    }

    /// Two example records for users to copy and extend.
    pub fn sample_profiles() -> BTreeMap<&'static str, DeviceProfile> {
        BTreeMap::from([
            (
                "Custom ESP32 Project",
                DeviceProfile::esptool("esp32", 921_600, "0x10000", "CH9102"),
            ),
            (
                "Custom Arduino Mega",
                DeviceProfile::avrdude("atmega2560", 115_200, "wiring", "Arduino Mega"),
            ),
        ])
    }
}

fn load_user_profiles(path: &Path) -> Result<Vec<(String, DeviceProfile)>, Error> {
    let raw = fs::read_to_string(path)?;
    let parsed: BTreeMap<String, DeviceProfile> = toml::from_str(&raw)?;

    // Profiles violating the per-tool field requirements are skipped rather
    // than aborting startup.
    let profiles = parsed
        .into_iter()
        .filter(|(name, profile)| match profile.validate() {
            Ok(()) => true,
            Err(missing) => {
                warn!("ignoring profile '{name}': missing `{missing}`");
                false
            }
        })
        .collect();

    Ok(profiles)
}

const USER_CONFIG_FILENAME: &str = "projects.toml";

/// Lookup order: working directory, the executable's directory, then the
/// per-user configuration directory.
fn find_user_config() -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        let local = cwd.join(USER_CONFIG_FILENAME);
        if local.exists() {
            return Some(local);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let beside_exe = dir.join(USER_CONFIG_FILENAME);
            if beside_exe.exists() {
                return Some(beside_exe);
            }
        }
    }

    let project_dirs = ProjectDirs::from("", "", "fwuploader")?;
    let global = project_dirs.config_dir().join(USER_CONFIG_FILENAME);
    global.exists().then_some(global)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn load_from(contents: &str) -> ProfileSet {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.toml");
        fs::write(&path, contents).unwrap();
        ProfileSet::load(Some(&path))
    }

    #[test]
    fn builtin_profiles_are_present_and_valid() {
        let profiles = ProfileSet::load(Some(Path::new("/nonexistent/projects.toml")));

        let generic = profiles.get("ESP32 - Generic").unwrap();
        assert_eq!(generic.chip, "esp32");
        assert_eq!(generic.tool, Tool::Esptool);
        assert_eq!(generic.baud, 460_800);
        assert_eq!(generic.address.as_deref(), Some("0x10000"));

        for name in profiles.names(true) {
            assert!(profiles.get(name).unwrap().validate().is_ok());
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let profiles = ProfileSet::load(Some(Path::new("/nonexistent/projects.toml")));
        assert!(matches!(
            profiles.get("No Such Board"),
            Err(Error::UnknownProfile(_))
        ));
    }

    #[test]
    fn advanced_flag_appends_builtins() {
        let profiles = load_from(
            r#"
            ["Stage Box MkII"]
            chip = "esp32s3"
            tool = "esptool"
            baud = 921600
            address = "0x10000"
            port_hint = "USB JTAG"
            "#,
        );

        assert_eq!(profiles.names(false), ["Stage Box MkII"]);

        let all = profiles.names(true);
        assert_eq!(all.first(), Some(&"Stage Box MkII"));
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn user_profile_replaces_builtin_whole_record() {
        let profiles = load_from(
            r#"
            ["Arduino Uno"]
            chip = "atmega328p"
            tool = "avrdude"
            baud = "57600"
            programmer = "usbasp"
            "#,
        );

        let uno = profiles.get("Arduino Uno").unwrap();
        assert_eq!(uno.baud, 57_600);
        assert_eq!(uno.programmer.as_deref(), Some("usbasp"));
        // Field-for-field replacement: the built-in port hint does not
        // survive the overlay.
        assert_eq!(uno.port_hint, "");

        // The overridden name is listed once, as a primary profile.
        let all = profiles.names(true);
        assert_eq!(all.iter().filter(|name| **name == "Arduino Uno").count(), 1);
        assert!(profiles.names(false).contains(&"Arduino Uno"));
    }

    #[test]
    fn baud_accepts_integer_and_string() {
        let profiles = load_from(
            r#"
            ["Int Baud"]
            chip = "esp32"
            tool = "esptool"
            baud = 460800
            address = "0x0"

            ["Str Baud"]
            chip = "atmega328p"
            tool = "avrdude"
            baud = "115200"
            programmer = "arduino"
            "#,
        );

        assert_eq!(profiles.get("Int Baud").unwrap().baud, 460_800);
        assert_eq!(profiles.get("Str Baud").unwrap().baud, 115_200);
    }

    #[test]
    fn incomplete_profile_is_skipped_with_builtins_kept() {
        let profiles = load_from(
            r#"
            ["Broken ESP32"]
            chip = "esp32"
            tool = "esptool"
            baud = 460800
            "#,
        );

        assert!(matches!(
            profiles.get("Broken ESP32"),
            Err(Error::UnknownProfile(_))
        ));
        assert!(profiles.get("ESP32 - Generic").is_ok());
    }

    #[test]
    fn malformed_file_is_not_fatal() {
        let profiles = load_from("this is not { toml");
        assert_eq!(profiles.names(false), Vec::<&str>::new());
        assert_eq!(profiles.names(true).len(), 7);
    }

    #[test]
    fn sample_profiles_parse_back_as_valid_user_config() {
        let serialized = toml::to_string_pretty(&ProfileSet::sample_profiles()).unwrap();
        let profiles = load_from(&serialized);

        let esp = profiles.get("Custom ESP32 Project").unwrap();
        assert_eq!(esp.baud, 921_600);
        let mega = profiles.get("Custom Arduino Mega").unwrap();
        assert_eq!(mega.programmer.as_deref(), Some("wiring"));
        assert_eq!(mega.port_hint, "Arduino Mega");
    }
}

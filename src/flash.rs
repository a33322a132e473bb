// SPDX-License-Identifier: GPL-3.0-only

//! Flash mode and torch LED control via Linux sysfs
//!
//! Discovers flash LEDs exposed at `/sys/class/leds/*:flash` and drives them in
//! torch mode through the `brightness` file, which is group-writable on most
//! phones (usually by `feedbackd`).

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default sysfs location of LED class devices
pub const LEDS_DIR: &str = "/sys/class/leds";

/// Flash operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashMode {
    /// Flash LED is off
    #[default]
    Off,
    /// Torch / flashlight mode (LED stays on continuously)
    Torch,
}

impl FlashMode {
    /// Flip between off and torch
    pub fn toggle(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::Torch,
            FlashMode::Torch => FlashMode::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self == FlashMode::Torch
    }
}

impl std::fmt::Display for FlashMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlashMode::Off => write!(f, "off"),
            FlashMode::Torch => write!(f, "torch"),
        }
    }
}

/// A flash LED device discovered via sysfs
#[derive(Debug, Clone)]
pub struct FlashDevice {
    /// Sysfs path, e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    /// Maximum brightness value (from `max_brightness` file)
    max_brightness: u32,
    /// Directory basename
    name: String,
}

impl FlashDevice {
    /// Scan the system LED directory
    pub fn discover() -> Vec<FlashDevice> {
        Self::discover_in(Path::new(LEDS_DIR))
    }

    /// Scan `leds_dir` for entries matching `*:flash` and return the devices
    /// whose brightness we can write.
    pub fn discover_in(leds_dir: &Path) -> Vec<FlashDevice> {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            debug!(dir = %leds_dir.display(), "No LED class directory, flash disabled");
            return Vec::new();
        };

        let mut devices = Vec::new();

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name_str) = name.to_str() else {
                continue;
            };

            if !name_str.ends_with(":flash") {
                continue;
            }

            let led_path = entry.path();
            let max_brightness_path = led_path.join("max_brightness");

            let max_brightness = match std::fs::read_to_string(&max_brightness_path) {
                Ok(s) => match s.trim().parse::<u32>() {
                    Ok(v) if v > 0 => v,
                    _ => {
                        warn!(path = %max_brightness_path.display(), "Invalid max_brightness value");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %max_brightness_path.display(), error = %e, "Cannot read max_brightness");
                    continue;
                }
            };

            let brightness_path = led_path.join("brightness");
            if let Err(e) = std::fs::OpenOptions::new()
                .write(true)
                .open(&brightness_path)
            {
                warn!(
                    path = %brightness_path.display(),
                    error = %e,
                    "Flash LED found but not writable"
                );
                continue;
            }

            info!(name = name_str, max_brightness, "Discovered flash LED");
            devices.push(FlashDevice {
                path: led_path,
                max_brightness,
                name: name_str.to_string(),
            });
        }

        // Deterministic order (white before yellow)
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    /// Get the device name (e.g. "white:flash")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set raw brightness value (0 = off, max_brightness = full)
    pub fn set_brightness(&self, value: u32) -> io::Result<()> {
        let clamped = value.min(self.max_brightness);
        std::fs::write(self.path.join("brightness"), clamped.to_string())
    }

    /// Drive the LED for the given mode
    pub fn apply(&self, mode: FlashMode) -> io::Result<()> {
        match mode {
            FlashMode::Off => self.set_brightness(0),
            FlashMode::Torch => self.set_brightness(self.max_brightness),
        }
    }
}

/// Apply a mode to every LED, returning the first failure
pub fn apply_all(devices: &[FlashDevice], mode: FlashMode) -> io::Result<()> {
    let mut first_error = None;
    for dev in devices {
        if let Err(e) = dev.apply(mode) {
            warn!(device = %dev.name, error = %e, %mode, "Failed to drive flash LED");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_led(root: &Path, name: &str, max: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("max_brightness"), max).unwrap();
        std::fs::write(dir.join("brightness"), "0").unwrap();
        dir
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        assert_eq!(FlashMode::Off.toggle(), FlashMode::Torch);
        assert_eq!(FlashMode::Off.toggle().toggle(), FlashMode::Off);
        assert_eq!(FlashMode::Torch.toggle().toggle(), FlashMode::Torch);
    }

    #[test]
    fn test_discover_only_flash_entries() {
        let root = tempfile::tempdir().unwrap();
        fake_led(root.path(), "yellow:flash", "200\n");
        fake_led(root.path(), "white:flash", "255\n");
        fake_led(root.path(), "input3::capslock", "1\n");
        fake_led(root.path(), "red:flash", "0\n");

        let devices = FlashDevice::discover_in(root.path());
        let names: Vec<&str> = devices.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["white:flash", "yellow:flash"]);
    }

    #[test]
    fn test_torch_writes_max_brightness() {
        let root = tempfile::tempdir().unwrap();
        let led = fake_led(root.path(), "white:flash", "180");
        let devices = FlashDevice::discover_in(root.path());

        apply_all(&devices, FlashMode::Torch).unwrap();
        assert_eq!(std::fs::read_to_string(led.join("brightness")).unwrap(), "180");

        apply_all(&devices, FlashMode::Off).unwrap();
        assert_eq!(std::fs::read_to_string(led.join("brightness")).unwrap(), "0");
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let root = tempfile::tempdir().unwrap();
        assert!(FlashDevice::discover_in(&root.path().join("absent")).is_empty());
    }
}

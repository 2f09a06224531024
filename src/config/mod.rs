mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::{Path, PathBuf};
use std::time::Duration;

use evstream::AcquisitionSettings;

use file::FileConfig;

pub const DEFAULT_INPUT_DIR: &str = "/dev/input";

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub grab: bool,
    pub dead_zone: bool,
    pub flat: Option<i32>,
    pub calibrate: bool,
    pub acquisition: AcquisitionSettings,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();
        Self::merge(cli, file_config)
    }

    fn merge(cli: &Cli, file_config: FileConfig) -> Self {
        let defaults = AcquisitionSettings::default();
        let acquisition = AcquisitionSettings {
            poll_timeout: cli
                .poll_timeout_ms
                .or(file_config.poll_timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_timeout),
            records_per_read: cli
                .records_per_read
                .or(file_config.records_per_read)
                .unwrap_or(defaults.records_per_read),
            queue_capacity: cli
                .queue_capacity
                .or(file_config.queue_capacity)
                .unwrap_or(defaults.queue_capacity),
            ..defaults
        };

        Self {
            input_dir: cli
                .input_dir
                .clone()
                .or(file_config.input_dir)
                .unwrap_or_else(|| DEFAULT_INPUT_DIR.into()),
            grab: if cli.no_grab {
                false
            } else {
                cli.grab || file_config.grab
            },
            dead_zone: if cli.no_dead_zone {
                false
            } else {
                cli.dead_zone || file_config.dead_zone
            },
            flat: cli.flat.or(file_config.flat),
            calibrate: !cli.raw && file_config.calibrate,
            acquisition,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.acquisition.records_per_read == 0 {
            return Err("records_per_read must be at least 1");
        }
        if self.acquisition.poll_timeout.is_zero() {
            return Err("poll_timeout_ms must be at least 1");
        }
        Ok(())
    }

    /// A bare node name such as `event3` is looked up in `input_dir`.
    pub fn resolve_device(&self, device: &Path) -> PathBuf {
        if device.components().count() > 1 || device.is_absolute() {
            device.to_path_buf()
        } else {
            self.input_dir.join(device)
        }
    }
}

use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "evstream.toml";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub input_dir: Option<PathBuf>,
    #[serde(default)]
    pub grab: bool,
    #[serde(default = "default_true")]
    pub dead_zone: bool,
    pub flat: Option<i32>,
    #[serde(default = "default_true")]
    pub calibrate: bool,
    pub queue_capacity: Option<usize>,
    pub records_per_read: Option<usize>,
    pub poll_timeout_ms: Option<u64>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            grab: false,
            dead_zone: true,
            flat: None,
            calibrate: true,
            queue_capacity: None,
            records_per_read: None,
            poll_timeout_ms: None,
        }
    }
}

fn default_true() -> bool {
    true
}

pub fn parse(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_from_path(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse(&content) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

pub fn load_from_default_paths() -> Option<FileConfig> {
    default_config_paths()
        .into_iter()
        .filter(|path| path.exists())
        .find_map(|path| load_from_path(&path))
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join(CONFIG_FILE_NAME));
    }
    paths
}

//! Enumerate input device nodes.

use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use evstream::Device;

use crate::config::Config;

/// Character devices directly under `dir`, in node order. Symlinks are
/// not followed. An unreadable directory yields nothing.
pub fn scan_inputs(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Unable to read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut nodes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            std::fs::symlink_metadata(path)
                .map(|meta| meta.file_type().is_char_device())
                .unwrap_or(false)
        })
        .collect();
    nodes.sort_by_key(|path| node_order(path));
    nodes
}

// event2 before event10.
fn node_order(path: &Path) -> (String, u64, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (stem, number) = name.split_at(name.len() - digits);
    (stem.to_string(), number.parse().unwrap_or(0), name.clone())
}

pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let nodes = scan_inputs(&config.input_dir);
    if nodes.is_empty() {
        eprintln!("No input devices found in {}", config.input_dir.display());
        return Ok(());
    }

    println!("Available devices:");
    for (index, path) in nodes.iter().enumerate() {
        match Device::open(path) {
            Ok(device) => {
                let info = device.info();
                println!(
                    "[{}] {}  {}  ({:04x}:{:04x}, {} axes)",
                    index,
                    path.display(),
                    info.name.as_deref().unwrap_or("unnamed"),
                    info.id.vendor,
                    info.id.product,
                    device.abs_infos().len()
                );
            }
            Err(e) => {
                log::debug!("Skipping {}: {}", path.display(), e);
                println!("[{}] {}  ({})", index, path.display(), e);
            }
        }
    }
    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "evstream")]
#[command(about = "Inspect and stream Linux evdev input devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory scanned for input device nodes
    #[arg(long, env = "EVSTREAM_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Take exclusive access to the device while dumping
    #[arg(long)]
    pub grab: bool,

    /// Leave the device shared (overrides config file)
    #[arg(long, conflicts_with = "grab")]
    pub no_grab: bool,

    /// Use the deadzone mapping for axes
    #[arg(long)]
    pub dead_zone: bool,

    /// Use the linear mapping for axes (overrides config file)
    #[arg(long, conflicts_with = "dead_zone")]
    pub no_dead_zone: bool,

    /// Deadzone half-width replacing the flat declared by the driver
    #[arg(long)]
    pub flat: Option<i32>,

    /// Print raw axis values without calibration
    #[arg(long)]
    pub raw: bool,

    /// Batches queued before the reader blocks
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Records fetched per read
    #[arg(long)]
    pub records_per_read: Option<usize>,

    /// Readiness wait timeout in milliseconds
    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,

    /// Path to config file
    #[arg(long, env = "EVSTREAM_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List input device nodes with their names
    List,
    /// Stream events from one device until interrupted
    Dump {
        /// Device node path, or a node name such as "event3"
        device: PathBuf,
    },
}

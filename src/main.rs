mod config;
mod dump;
mod list;

use clap::Parser;

use config::{Cli, Command, Config};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(&cli);
    config.validate()?;

    log::debug!(
        "evstream starting (input_dir={}, grab={}, dead_zone={}, calibrate={})",
        config.input_dir.display(),
        config.grab,
        config.dead_zone,
        config.calibrate
    );

    match &cli.command {
        Command::List => list::run(&config),
        Command::Dump { device } => dump::run(&config, device),
    }
}

mod app;
mod cli;
mod config;
mod core;
mod widgets;

use std::fs::{self, File};
use std::path::Path;

use anyhow::Result;
use log::{info, LevelFilter};
use simplelog::{Config as LogConfig, WriteLogger};

use app::App;
use cli::parse_args;

fn main() -> Result<()> {
    let config = parse_args();

    if let Some(level) = config.log_level {
        setup_logging(level)?;
    }
    info!("Starting portreader with {:?}", config);

    let mut terminal = ratatui::init();

    let app_result = App::new(config).run(&mut terminal);

    ratatui::restore();

    app_result?;

    info!("portreader shutting down");
    Ok(())
}

fn setup_logging(level: LevelFilter) -> Result<()> {
    // The terminal belongs to the UI, so log lines go to a file.
    let log_dir = Path::new("logs");
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let log_file_path = log_dir.join(format!("portreader_{}.log", timestamp));

    WriteLogger::init(level, LogConfig::default(), File::create(log_file_path)?)?;

    Ok(())
}

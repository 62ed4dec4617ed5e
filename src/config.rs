use std::path::PathBuf;
use std::time::Duration;

use log::LevelFilter;

use crate::core::filters::FilterCriterion;
use crate::core::source::{CommandSource, FileSource, ListingSource};

/// Where connection listings come from.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Command(CommandSource),
    Replay(PathBuf),
}

impl SourceConfig {
    pub fn into_source(self) -> Box<dyn ListingSource> {
        match self {
            SourceConfig::Command(command) => Box::new(command),
            SourceConfig::Replay(path) => Box::new(FileSource::new(path)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Period of the snapshot refresh timer
    pub refresh_interval: Duration,
    /// Period of the UI tick (system readout, detail pane)
    pub ui_interval: Duration,
    /// View filter active at startup
    pub initial_filter: FilterCriterion,
    pub source: SourceConfig,
    /// File logging is off unless a level is given
    pub log_level: Option<LevelFilter>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
            ui_interval: Duration::from_secs(1),
            initial_filter: FilterCriterion::All,
            source: SourceConfig::Command(CommandSource::netstat()),
            log_level: None,
        }
    }
}

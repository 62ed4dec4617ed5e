use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;

use crate::config::{Config, SourceConfig};
use crate::core::filters::FilterCriterion;
use crate::core::source::CommandSource;

fn command() -> Command {
    Command::new("portreader")
        .version("0.1.0")
        .about("Watch active connections with their owning processes and services")
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .help("Initial view filter: All, TCP, UDP, Listening or Established")
                .value_name("FILTER")
                .num_args(1)
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .help("Seconds between connection snapshots")
                .value_name("SECONDS")
                .num_args(1)
        )
        .arg(
            Arg::new("ui-interval")
                .long("ui-interval")
                .help("Milliseconds between system readout updates")
                .value_name("MILLISECONDS")
                .num_args(1)
        )
        .arg(
            Arg::new("source-cmd")
                .short('c')
                .long("source-cmd")
                .help("Command producing a `netstat -ano` style listing (Windows format; required off Windows) [default: netstat -ano]")
                .value_name("COMMAND")
                .num_args(1)
        )
        .arg(
            Arg::new("replay")
                .short('r')
                .long("replay")
                .help("Read the listing from a captured file instead of running a command")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .conflicts_with("source-cmd")
                .num_args(1)
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .help("Write a log file under logs/ at this level")
                .value_name("LEVEL")
                .value_parser(clap::value_parser!(LevelFilter))
                .num_args(1)
        )
}

pub fn parse_args() -> Config {
    config_from_matches(&command().get_matches())
}

fn config_from_matches(matches: &ArgMatches) -> Config {
    let mut config = Config::default();

    if let Some(name) = matches.get_one::<String>("filter") {
        let criterion = FilterCriterion::from_name(name);
        if criterion == FilterCriterion::All && !name.eq_ignore_ascii_case("all") {
            eprintln!("Warning: Unknown filter '{}', showing all connections", name);
        }
        config.initial_filter = criterion;
    }

    if let Some(secs) = matches.get_one::<String>("interval") {
        match secs.parse::<u64>() {
            Ok(secs) if secs > 0 => config.refresh_interval = Duration::from_secs(secs),
            _ => eprintln!("Warning: Invalid interval '{}', using default", secs),
        }
    }

    if let Some(millis) = matches.get_one::<String>("ui-interval") {
        match millis.parse::<u64>() {
            Ok(millis) if millis > 0 => config.ui_interval = Duration::from_millis(millis),
            _ => eprintln!("Warning: Invalid UI interval '{}', using default", millis),
        }
    }

    if let Some(path) = matches.get_one::<PathBuf>("replay") {
        config.source = SourceConfig::Replay(path.clone());
    } else if let Some(line) = matches.get_one::<String>("source-cmd") {
        match CommandSource::from_command_line(line) {
            Some(command) => config.source = SourceConfig::Command(command),
            None => eprintln!("Warning: Empty source command, using netstat -ano"),
        }
    }

    config.log_level = matches.get_one::<LevelFilter>("log-level").copied();

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::ListingSource;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["portreader"];
        argv.extend_from_slice(args);
        config_from_matches(&command().get_matches_from(argv))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.ui_interval, Duration::from_secs(1));
        assert_eq!(config.initial_filter, FilterCriterion::All);
        assert!(config.log_level.is_none());
        match config.source {
            SourceConfig::Command(cmd) => assert_eq!(cmd.describe(), "netstat -ano"),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--filter", "listening",
            "--interval", "10",
            "--ui-interval", "250",
            "--log-level", "debug",
            "--replay", "capture.txt",
        ]);
        assert_eq!(config.initial_filter, FilterCriterion::Listening);
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.ui_interval, Duration::from_millis(250));
        assert_eq!(config.log_level, Some(LevelFilter::Debug));
        assert!(matches!(config.source, SourceConfig::Replay(ref p) if p == &PathBuf::from("capture.txt")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = parse(&["--filter", "closing", "--interval", "0", "--ui-interval", "soon"]);
        assert_eq!(config.initial_filter, FilterCriterion::All);
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.ui_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_custom_source_command() {
        let config = parse(&["--source-cmd", "cat /tmp/listing.txt"]);
        match config.source {
            SourceConfig::Command(cmd) => assert_eq!(cmd.describe(), "cat /tmp/listing.txt"),
            other => panic!("unexpected source {:?}", other),
        }
    }
}

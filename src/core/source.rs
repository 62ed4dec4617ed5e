use std::fs;
use std::path::PathBuf;
use std::process::Command;

use log::debug;

use super::error::MonitorError;

/// Console window suppression for child processes on Windows.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Produces one complete, point-in-time connection listing as text.
pub trait ListingSource: Send {
    fn fetch(&self) -> Result<String, MonitorError>;

    fn describe(&self) -> String;
}

/// Runs the system listing tool and captures its whole stdout.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn netstat() -> Self {
        Self::new("netstat", vec!["-ano".to_string()])
    }

    /// Splits a command line such as `netstat -ano` on whitespace.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl ListingSource for CommandSource {
    fn fetch(&self) -> Result<String, MonitorError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let output = command.output().map_err(|e| {
            MonitorError::SourceUnavailable(format!("failed to run {}: {}", self.describe(), e))
        })?;

        if !output.status.success() {
            return Err(MonitorError::SourceUnavailable(format!(
                "{} exited with {}: {}",
                self.describe(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!("{} produced {} bytes", self.describe(), output.stdout.len());
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Replays a listing captured earlier, e.g. `netstat -ano > listing.txt`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ListingSource for FileSource {
    fn fetch(&self) -> Result<String, MonitorError> {
        let bytes = fs::read(&self.path).map_err(|e| {
            MonitorError::SourceUnavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_split() {
        let src = CommandSource::from_command_line("  netstat   -ano ").unwrap();
        assert_eq!(src.describe(), "netstat -ano");
        assert!(CommandSource::from_command_line("   ").is_none());
    }

    #[test]
    fn test_missing_program_is_source_unavailable() {
        let src = CommandSource::new("portreader-no-such-listing-tool", Vec::new());
        match src.fetch() {
            Err(MonitorError::SourceUnavailable(reason)) => {
                assert!(reason.contains("portreader-no-such-listing-tool"))
            }
            other => panic!("unexpected fetch result: {:?}", other),
        }
    }

    #[test]
    fn test_file_source_reads_listing() {
        let path = std::env::temp_dir().join(format!("portreader-listing-{}.txt", std::process::id()));
        fs::write(&path, "  TCP    0.0.0.0:135    0.0.0.0:0    LISTENING    1044\r\n").unwrap();

        let text = FileSource::new(&path).fetch().unwrap();
        assert!(text.contains("LISTENING"));

        fs::remove_file(&path).ok();
        assert!(matches!(
            FileSource::new(&path).fetch(),
            Err(MonitorError::SourceUnavailable(_))
        ));
    }
}

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// The listing tool could not be started or its output could not be read.
    #[error("connection listing unavailable: {0}")]
    SourceUnavailable(String),

    #[error("process {pid} no longer exists")]
    ProcessGone { pid: u32 },

    #[error("identity resolution failed for pid {pid}: {reason}")]
    ResolutionFailed { pid: u32, reason: String },

    /// Only raised by the one-shot lookup behind the process info popup.
    #[error("cannot obtain process info for pid {pid}: {reason}")]
    OnDemandLookupFailed { pid: u32, reason: String },
}

use log::{debug, warn};

use super::connection::ProcessIdentity;
use super::error::MonitorError;
use super::process::{ProcessDirectory, ProcessLookup, SysinfoProcesses};
use super::services::{default_service_directory, ServiceDirectory};

/// Fresh process details for the selection surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDetails {
    pub pid: u32,
    pub name: String,
    pub path: Option<String>,
}

impl ProcessDetails {
    pub fn path_or_na(&self) -> &str {
        self.path.as_deref().unwrap_or("N/A")
    }
}

/// Maps pids to process and service identity. Every field degrades on its own:
/// a vanished process yields "Unknown", an unreadable executable an empty path
/// and an unqueryable service directory an empty service.
pub struct IdentityResolver {
    processes: Box<dyn ProcessDirectory>,
    services: Box<dyn ServiceDirectory>,
}

impl IdentityResolver {
    pub fn new(processes: Box<dyn ProcessDirectory>, services: Box<dyn ServiceDirectory>) -> Self {
        Self {
            processes,
            services,
        }
    }

    pub fn for_host() -> Self {
        Self::new(Box::new(SysinfoProcesses::new()), default_service_directory())
    }

    /// Reloads the process and service tables ahead of a snapshot.
    pub fn refresh(&mut self) {
        self.processes.refresh();
        if let Err(e) = self.services.refresh() {
            warn!("Service directory unavailable, service names left blank: {}", e);
        }
    }

    pub fn resolve(&self, pid: u32) -> ProcessIdentity {
        let (name, path) = match self.processes.lookup(pid) {
            ProcessLookup::Found { name, path } => (name, path.unwrap_or_default()),
            ProcessLookup::Gone => {
                debug!("{}", MonitorError::ProcessGone { pid });
                return ProcessIdentity::unknown();
            }
        };

        let service = match self.services.service_for_pid(pid) {
            Ok(Some(service)) => service.label().to_string(),
            Ok(None) => String::new(),
            Err(e) => {
                debug!("{}", e);
                String::new()
            }
        };

        ProcessIdentity {
            name,
            path,
            service,
        }
    }

    /// One-shot lookup behind the process info popup, bypassing the snapshot
    /// tables.
    pub fn lookup_now(&mut self, pid: u32) -> Result<ProcessDetails, MonitorError> {
        match self.processes.lookup_fresh(pid) {
            ProcessLookup::Found { name, path } => Ok(ProcessDetails { pid, name, path }),
            ProcessLookup::Gone => Err(MonitorError::OnDemandLookupFailed {
                pid,
                reason: "process no longer exists".to_string(),
            }),
        }
    }
}

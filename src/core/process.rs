use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System, UpdateKind};

/// Result of asking the process table about one pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessLookup {
    /// `path` is None when the executable cannot be inspected, typically a
    /// process owned by another user.
    Found { name: String, path: Option<String> },
    Gone,
}

pub trait ProcessDirectory: Send {
    /// Re-reads the whole process table. Called once per snapshot.
    fn refresh(&mut self);

    /// Answers from the table as of the last `refresh`.
    fn lookup(&self, pid: u32) -> ProcessLookup;

    /// Re-reads just this pid before answering.
    fn lookup_fresh(&mut self, pid: u32) -> ProcessLookup;
}

pub struct SysinfoProcesses {
    system: System,
}

impl SysinfoProcesses {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing().with_processes(Self::refresh_kind());
        Self {
            system: System::new_with_specifics(refresh_kind),
        }
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet)
    }
}

impl ProcessDirectory for SysinfoProcesses {
    fn refresh(&mut self) {
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, true, Self::refresh_kind());
    }

    fn lookup(&self, pid: u32) -> ProcessLookup {
        match self.system.process(Pid::from_u32(pid)) {
            Some(process) => ProcessLookup::Found {
                name: process.name().to_string_lossy().to_string(),
                path: process.exe().map(|p| p.to_string_lossy().to_string()),
            },
            None => ProcessLookup::Gone,
        }
    }

    fn lookup_fresh(&mut self, pid: u32) -> ProcessLookup {
        let pid_key = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid_key]),
            true,
            Self::refresh_kind(),
        );
        self.lookup(pid)
    }
}

//! Lookup of the registered service that owns a process.
//!
//! Windows asks the service control manager for every active service and its
//! process id. Linux reads the systemd unit from `/proc/<pid>/cgroup`. Other
//! platforms report no services at all.

use std::collections::HashMap;

use super::error::MonitorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub display_name: Option<String>,
}

impl ServiceIdentity {
    /// Display name when the directory has one, short name otherwise.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(display) if !display.is_empty() => display,
            _ => &self.name,
        }
    }
}

pub trait ServiceDirectory: Send {
    /// Called once per snapshot before any `service_for_pid` call.
    fn refresh(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }

    fn service_for_pid(&self, pid: u32) -> Result<Option<ServiceIdentity>, MonitorError>;
}

#[cfg(any(test, not(any(windows, target_os = "linux"))))]
pub struct NoServices;

#[cfg(any(test, not(any(windows, target_os = "linux"))))]
impl ServiceDirectory for NoServices {
    fn service_for_pid(&self, _pid: u32) -> Result<Option<ServiceIdentity>, MonitorError> {
        Ok(None)
    }
}

/// Services keyed by the pid they currently run in. The first service seen for
/// a pid wins, matching the order the directory enumerates them in.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug, Default)]
pub struct ServiceTable {
    by_pid: HashMap<u32, ServiceIdentity>,
}

#[cfg_attr(not(windows), allow(dead_code))]
impl ServiceTable {
    pub fn insert(&mut self, pid: u32, service: ServiceIdentity) {
        if pid == 0 {
            return;
        }
        self.by_pid.entry(pid).or_insert(service);
    }

    pub fn get(&self, pid: u32) -> Option<&ServiceIdentity> {
        self.by_pid.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.by_pid.len()
    }
}

pub fn default_service_directory() -> Box<dyn ServiceDirectory> {
    #[cfg(windows)]
    {
        Box::new(ScmServices::new())
    }
    #[cfg(target_os = "linux")]
    {
        Box::new(SystemdServices::new())
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Box::new(NoServices)
    }
}

#[cfg(target_os = "linux")]
pub use self::systemd::SystemdServices;

#[cfg(target_os = "linux")]
mod systemd {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::PathBuf;

    use super::{unit_from_cgroup, ServiceDirectory, ServiceIdentity};
    use crate::core::error::MonitorError;

    pub struct SystemdServices {
        proc_root: PathBuf,
    }

    impl SystemdServices {
        pub fn new() -> Self {
            Self::with_proc_root("/proc")
        }

        pub fn with_proc_root(root: impl Into<PathBuf>) -> Self {
            Self {
                proc_root: root.into(),
            }
        }
    }

    impl ServiceDirectory for SystemdServices {
        fn service_for_pid(&self, pid: u32) -> Result<Option<ServiceIdentity>, MonitorError> {
            let path = self.proc_root.join(pid.to_string()).join("cgroup");
            match fs::read_to_string(&path) {
                Ok(contents) => Ok(unit_from_cgroup(&contents).map(|name| ServiceIdentity {
                    name,
                    display_name: None,
                })),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(MonitorError::ResolutionFailed {
                    pid,
                    reason: format!("{}: {}", path.display(), e),
                }),
            }
        }
    }
}

/// Extracts the system service unit from a `/proc/<pid>/cgroup` listing.
/// Per-user managers (`user@1000.service`) are not services of the host.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn unit_from_cgroup(contents: &str) -> Option<String> {
    contents
        .lines()
        .filter_map(|line| line.splitn(3, ':').nth(2))
        .flat_map(|path| path.split('/'))
        .filter(|segment| segment.ends_with(".service") && !segment.starts_with("user@"))
        .last()
        .map(|unit| unit.trim_end_matches(".service").to_string())
}

#[cfg(windows)]
pub use self::scm::ScmServices;

#[cfg(windows)]
mod scm {
    use std::ptr;

    use log::debug;
    use windows_sys::Win32::Foundation::{GetLastError, ERROR_MORE_DATA};
    use windows_sys::Win32::System::Services::{
        CloseServiceHandle, EnumServicesStatusExW, OpenSCManagerW, ENUM_SERVICE_STATUS_PROCESSW,
        SC_ENUM_PROCESS_INFO, SC_MANAGER_ENUMERATE_SERVICE, SERVICE_ACTIVE, SERVICE_WIN32,
    };

    use super::{ServiceDirectory, ServiceIdentity, ServiceTable};
    use crate::core::error::MonitorError;

    const INITIAL_BUFFER_BYTES: usize = 64 * 1024;

    pub struct ScmServices {
        table: Result<ServiceTable, String>,
    }

    impl ScmServices {
        pub fn new() -> Self {
            Self {
                table: Ok(ServiceTable::default()),
            }
        }
    }

    impl ServiceDirectory for ScmServices {
        fn refresh(&mut self) -> Result<(), MonitorError> {
            self.table = enumerate_active_services();
            match &self.table {
                Ok(table) => {
                    debug!("Service control manager reported {} service pids", table.len());
                    Ok(())
                }
                Err(reason) => Err(MonitorError::ResolutionFailed {
                    pid: 0,
                    reason: reason.clone(),
                }),
            }
        }

        fn service_for_pid(&self, pid: u32) -> Result<Option<ServiceIdentity>, MonitorError> {
            match &self.table {
                Ok(table) => Ok(table.get(pid).cloned()),
                Err(reason) => Err(MonitorError::ResolutionFailed {
                    pid,
                    reason: reason.clone(),
                }),
            }
        }
    }

    fn enumerate_active_services() -> Result<ServiceTable, String> {
        let scm = unsafe { OpenSCManagerW(ptr::null(), ptr::null(), SC_MANAGER_ENUMERATE_SERVICE) };
        if scm.is_null() {
            return Err(format!("could not open service control manager (error {})", unsafe {
                GetLastError()
            }));
        }

        let result = collect_services(scm);

        unsafe { CloseServiceHandle(scm) };
        result
    }

    fn collect_services(
        scm: windows_sys::Win32::System::Services::SC_HANDLE,
    ) -> Result<ServiceTable, String> {
        let mut table = ServiceTable::default();
        // u64 storage keeps the entries pointer-aligned.
        let mut buffer: Vec<u64> = vec![0; INITIAL_BUFFER_BYTES / 8];
        let mut resume_handle: u32 = 0;

        loop {
            let mut bytes_needed: u32 = 0;
            let mut returned: u32 = 0;
            let ok = unsafe {
                EnumServicesStatusExW(
                    scm,
                    SC_ENUM_PROCESS_INFO,
                    SERVICE_WIN32,
                    SERVICE_ACTIVE,
                    buffer.as_mut_ptr() as *mut u8,
                    (buffer.len() * 8) as u32,
                    &mut bytes_needed,
                    &mut returned,
                    &mut resume_handle,
                    ptr::null(),
                )
            };
            let more_data = ok == 0 && unsafe { GetLastError() } == ERROR_MORE_DATA;
            if ok == 0 && !more_data {
                return Err(format!("EnumServicesStatusExW failed (error {})", unsafe {
                    GetLastError()
                }));
            }

            let entries = unsafe {
                std::slice::from_raw_parts(
                    buffer.as_ptr() as *const ENUM_SERVICE_STATUS_PROCESSW,
                    returned as usize,
                )
            };
            for entry in entries {
                let name = unsafe { wide_to_string(entry.lpServiceName) };
                let display_name = unsafe { wide_to_string(entry.lpDisplayName) };
                if let Some(name) = name {
                    table.insert(
                        entry.ServiceStatusProcess.dwProcessId,
                        ServiceIdentity { name, display_name },
                    );
                }
            }

            if !more_data {
                return Ok(table);
            }
            let needed_words = (bytes_needed as usize).div_ceil(8);
            if needed_words > buffer.len() {
                buffer.resize(needed_words, 0);
            }
        }
    }

    unsafe fn wide_to_string(ptr: *const u16) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        Some(String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len)))
    }
}

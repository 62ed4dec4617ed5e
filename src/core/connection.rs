use std::fmt;

/// State recorded for UDP sockets, which have no connection state of their own.
pub const UDP_STATE_SENTINEL: &str = "NONE";

/// Process name used when a pid was listed but could not be resolved.
pub const UNKNOWN_PROCESS: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }

    /// Accepts the protocol token exactly as the listing tool prints it.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TCP" => Some(Protocol::Tcp),
            "UDP" => Some(Protocol::Udp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owning-process metadata attached to a record that carries a pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub name: String,
    pub path: String,
    pub service: String,
}

impl ProcessIdentity {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_PROCESS.to_string(),
            path: String::new(),
            service: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub protocol: Protocol,
    pub local_address: String,
    pub local_port: String,
    pub remote_address: String,
    pub remote_port: String,
    pub state: Option<String>,
    pub pid: Option<u32>,
    identity: Option<ProcessIdentity>,
}

impl ConnectionRecord {
    pub fn new(
        protocol: Protocol,
        local_address: String,
        local_port: String,
        remote_address: String,
        remote_port: String,
        state: Option<String>,
        pid: Option<u32>,
    ) -> Self {
        Self {
            protocol,
            local_address,
            local_port,
            remote_address,
            remote_port,
            state,
            pid,
            identity: None,
        }
    }

    /// Attaches resolved identity. Records without a pid stay unresolved.
    pub fn with_identity(mut self, identity: ProcessIdentity) -> Self {
        if self.pid.is_some() {
            self.identity = Some(identity);
        }
        self
    }

    pub fn identity(&self) -> Option<&ProcessIdentity> {
        self.identity.as_ref()
    }

    pub fn process_name(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.name.as_str())
    }

    pub fn process_path(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.path.as_str())
    }

    pub fn service_name(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.service.as_str())
    }

    /// Numeric local port, or None when the listing printed something else.
    pub fn local_port_number(&self) -> Option<u32> {
        self.local_port.parse::<u32>().ok()
    }

    pub fn state_is(&self, expected: &str) -> bool {
        self.state
            .as_deref()
            .map_or(false, |state| state.eq_ignore_ascii_case(expected))
    }

    pub fn local_endpoint(&self) -> String {
        format!("{}:{}", self.local_address, self.local_port)
    }

    pub fn remote_endpoint(&self) -> String {
        format!("{}:{}", self.remote_address, self.remote_port)
    }
}

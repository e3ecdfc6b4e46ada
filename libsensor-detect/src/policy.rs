use crate::alert::Severity;
use crate::parser::TcpControl;
use fnv::FnvHashSet;

/// Well-known server ports that never raise port-based alerts
pub const DEFAULT_SAFE_PORTS: [u16; 7] = [80, 443, 53, 123, 853, 5353, 4500];

pub const SSH_PORT: u16 = 22;
pub const RDP_PORT: u16 = 3389;

/// Outcome of the port policy for one TCP segment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortVerdict {
    /// Whitelisted destination
    Safe,
    Ssh,
    Rdp,
    /// Reset to a port with no other rule
    Reset,
    /// Nothing to report
    Ignore,
}

impl PortVerdict {
    pub fn severity(self) -> Option<Severity> {
        match self {
            PortVerdict::Ssh | PortVerdict::Rdp => Some(Severity::High),
            PortVerdict::Reset => Some(Severity::Medium),
            PortVerdict::Safe | PortVerdict::Ignore => None,
        }
    }
}

/// Classification of TCP segments by destination port (first match wins)
pub struct PortPolicy {
    safe_ports: FnvHashSet<u16>,
}

impl Default for PortPolicy {
    fn default() -> Self {
        PortPolicy::new(DEFAULT_SAFE_PORTS)
    }
}

impl PortPolicy {
    pub fn new<I: IntoIterator<Item = u16>>(safe_ports: I) -> Self {
        PortPolicy {
            safe_ports: safe_ports.into_iter().collect(),
        }
    }

    pub fn is_safe(&self, port: u16) -> bool {
        self.safe_ports.contains(&port)
    }

    pub fn classify(&self, dst_port: u16, control: &TcpControl) -> PortVerdict {
        if self.is_safe(dst_port) {
            PortVerdict::Safe
        } else if dst_port == SSH_PORT {
            PortVerdict::Ssh
        } else if dst_port == RDP_PORT {
            PortVerdict::Rdp
        } else if control.rst {
            PortVerdict::Reset
        } else {
            PortVerdict::Ignore
        }
    }
}

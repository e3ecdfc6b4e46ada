use std::fmt;
use std::net::Ipv4Addr;

/// Directional flow identifier: source and destination IPv4 addresses
///
/// `A -> B` and `B -> A` are distinct keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FlowKey {
    /// Source IP address
    pub src: Ipv4Addr,
    /// Destination IP address
    pub dst: Ipv4Addr,
}

impl FlowKey {
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        FlowKey { src, dst }
    }

    pub fn get_reverse(&self) -> FlowKey {
        FlowKey {
            src: self.dst,
            dst: self.src,
        }
    }
}

impl Default for FlowKey {
    fn default() -> Self {
        FlowKey {
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}->{}", self.src, self.dst)
    }
}

//! Detection core of the network sensor
//!
//! Frames are decoded by [`parse_frame`], then dispatched by the [`Detector`] to the
//! SYN scan detector (pure-SYN TCP), the port policy (other TCP) or the ICMP flood
//! detector. Alerts are enriched with the reverse-DNS name of the remote endpoint
//! and written as JSON lines by the [`AlertEmitter`].

pub mod alert;
pub mod classify;
pub mod config;
pub mod detector;
pub mod dns;
pub mod icmp;
pub mod output;
pub mod parser;
pub mod policy;
pub mod scan;

#[cfg(test)]
mod testutil;

pub use alert::{Alert, Protocol, Severity};
pub use classify::{is_private, remote_endpoint};
pub use config::DetectionConfig;
pub use detector::{Detector, DetectorStats};
pub use dns::{DnsEnrichment, NoLookup, ReverseResolver, SystemResolver};
pub use icmp::IcmpFloodDetector;
pub use output::AlertEmitter;
pub use parser::{parse_frame, ParsedFrame, ParsedIpv4Packet, ParsedTcpSegment, TcpControl};
pub use policy::{PortPolicy, PortVerdict};
pub use scan::{ScanDetector, ScanRecord};

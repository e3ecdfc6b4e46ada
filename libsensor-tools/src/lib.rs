//! Shared plumbing for the network sensor
//!
//! This crate holds the pieces that do not depend on the detection logic:
//! layered configuration, raw frames and timestamps, the flow key, the
//! `FrameAnalyzer` trait and an offline replay engine for pcap/pcap-ng files.

#[macro_use]
extern crate log;

mod analyzer;
mod config;
mod context;
mod engine;
mod error;
mod flow_key;
mod frame;
mod timestamp;

pub use analyzer::*;
pub use config::*;
pub use context::*;
pub use engine::*;
pub use error::*;
pub use flow_key::*;
pub use frame::*;
pub use timestamp::*;

pub use pcap_parser;

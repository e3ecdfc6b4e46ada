use crate::timestamp::Timestamp;
use pcap_parser::*;
use std::convert::TryFrom;

/// Capture context, updated by the engine before each frame is handed to the analyzer
#[derive(Clone, Default)]
pub struct CaptureContext {
    /// Timestamp of first frame seen
    pub first_frame_ts: Timestamp,
    /// Relative timestamp of current frame
    pub rel_ts: Timestamp,
    /// Index of current frame in capture
    pub frame_index: usize,
}

impl CaptureContext {
    /// Account for a new frame, and return its index
    pub fn update(&mut self, ts: Timestamp) -> usize {
        self.frame_index += 1;
        if self.first_frame_ts.is_null() {
            self.first_frame_ts = ts;
        }
        let rel = ts.saturating_since(self.first_frame_ts);
        self.rel_ts = Timestamp::new(rel.as_secs() as u32, rel.subsec_micros());
        trace!(
            "frame {} reltime {}.{:06}",
            self.frame_index,
            self.rel_ts.secs,
            self.rel_ts.micros
        );
        self.frame_index
    }
}

/// Information related to a capture interface (pcap-ng files may have several)
#[derive(Clone)]
pub struct InterfaceInfo {
    /// The `Linktype` used for data format
    pub link_type: Linktype,
    /// Time resolution units
    pub ts_unit: u64,
    /// Time offset
    pub if_tsoffset: u64,
    /// Maximum number of octets captured from each packet.
    pub snaplen: u32,
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        InterfaceInfo {
            link_type: Linktype(0),
            ts_unit: 1_000_000,
            if_tsoffset: 0,
            snaplen: 0,
        }
    }
}

pub fn pcapng_build_interface<'a>(idb: &'a InterfaceDescriptionBlock<'a>) -> InterfaceInfo {
    // extract if_tsoffset and if_tsresol
    let mut ts_unit: u64 = 1_000_000;
    let mut if_tsoffset: u64 = 0;
    for opt in idb.options.iter() {
        match opt.code {
            OptionCode::IfTsresol => {
                if let Some(&resol) = opt.value.first() {
                    if let Some(unit) = pcap_parser::build_ts_resolution(resol) {
                        ts_unit = unit;
                    }
                }
            }
            OptionCode::IfTsoffset => {
                if let Some(bytes) = opt.value.get(..8) {
                    if let Ok(int_bytes) = <[u8; 8]>::try_from(bytes) {
                        if_tsoffset = u64::from_le_bytes(int_bytes);
                    }
                }
            }
            _ => (),
        }
    }
    InterfaceInfo {
        link_type: idb.linktype,
        ts_unit,
        if_tsoffset,
        snaplen: idb.snaplen,
    }
}

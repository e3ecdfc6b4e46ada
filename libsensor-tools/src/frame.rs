use crate::timestamp::Timestamp;
use pcap_parser::Linktype;

/// A raw link-layer frame, as delivered by a capture provider
///
/// The frame borrows the provider's buffer and is only valid for the duration of
/// the analyzer callback.
pub struct Frame<'a> {
    pub ts: Timestamp,
    pub link_type: Linktype,
    /// Captured bytes
    pub data: &'a [u8],
    /// Declared captured length
    pub caplen: u32,
    /// Length of the frame on the wire
    pub origlen: u32,
    /// Index of this frame in the capture (starts at 1)
    pub frame_index: usize,
}

impl<'a> Frame<'a> {
    /// Bytes that can be safely decoded: the declared length, bounded by the buffer
    #[inline]
    pub fn captured(&self) -> &'a [u8] {
        let len = (self.caplen as usize).min(self.data.len());
        &self.data[..len]
    }
}

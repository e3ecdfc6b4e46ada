//! Hand-built Ethernet frames for tests

#![allow(dead_code)]

pub const FIN: u8 = 0x01;
pub const SYN: u8 = 0x02;
pub const RST: u8 = 0x04;
pub const PSH: u8 = 0x08;
pub const ACK: u8 = 0x10;
pub const URG: u8 = 0x20;

const PROTO_ICMP: u8 = 1;
const PROTO_TCP: u8 = 6;

pub struct FrameBuilder {
    src: [u8; 4],
    dst: [u8; 4],
    protocol: u8,
    src_port: u16,
    dst_port: u16,
    flags: u8,
    vlan: Option<u16>,
    ip_options: usize,
    frag_offset: u16,
    more_fragments: bool,
}

impl FrameBuilder {
    pub fn tcp(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16) -> Self {
        FrameBuilder {
            src,
            dst,
            protocol: PROTO_TCP,
            src_port,
            dst_port,
            flags: ACK,
            vlan: None,
            ip_options: 0,
            frag_offset: 0,
            more_fragments: false,
        }
    }

    pub fn icmp(src: [u8; 4], dst: [u8; 4]) -> Self {
        FrameBuilder {
            protocol: PROTO_ICMP,
            ..FrameBuilder::tcp(src, dst, 0, 0)
        }
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn vlan(mut self, id: u16) -> Self {
        self.vlan = Some(id);
        self
    }

    /// Add `len` bytes of IPv4 options (NOPs), `len` being a multiple of 4
    pub fn ip_options(mut self, len: usize) -> Self {
        self.ip_options = len;
        self
    }

    pub fn fragment(mut self, offset: u16, more_fragments: bool) -> Self {
        self.frag_offset = offset;
        self.more_fragments = more_fragments;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let l4 = match self.protocol {
            PROTO_TCP => {
                let mut v = Vec::with_capacity(20);
                v.extend_from_slice(&self.src_port.to_be_bytes());
                v.extend_from_slice(&self.dst_port.to_be_bytes());
                v.extend_from_slice(&1u32.to_be_bytes());
                v.extend_from_slice(&0u32.to_be_bytes());
                v.push(0x50);
                v.push(self.flags);
                v.extend_from_slice(&0xffffu16.to_be_bytes());
                v.extend_from_slice(&[0, 0, 0, 0]);
                v
            }
            _ => {
                // echo request, 8 bytes of data
                let mut v = vec![8, 0, 0, 0, 0, 1, 0, 1];
                v.extend_from_slice(b"pingpong");
                v
            }
        };

        let mut frame = Vec::new();
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb]);
        if let Some(id) = self.vlan {
            frame.extend_from_slice(&[0x81, 0x00]);
            frame.extend_from_slice(&(id & 0x0fff).to_be_bytes());
        }
        frame.extend_from_slice(&[0x08, 0x00]);

        let ihl = 5 + self.ip_options / 4;
        let total_len = (ihl * 4 + l4.len()) as u16;
        let frag = (if self.more_fragments { 0x2000 } else { 0 }) | (self.frag_offset & 0x1fff);
        frame.push(0x40 | ihl as u8);
        frame.push(0);
        frame.extend_from_slice(&total_len.to_be_bytes());
        frame.extend_from_slice(&0x1234u16.to_be_bytes());
        frame.extend_from_slice(&frag.to_be_bytes());
        frame.push(64);
        frame.push(self.protocol);
        frame.extend_from_slice(&[0, 0]);
        frame.extend_from_slice(&self.src);
        frame.extend_from_slice(&self.dst);
        frame.extend(std::iter::repeat(1u8).take(self.ip_options));
        frame.extend_from_slice(&l4);
        frame
    }
}

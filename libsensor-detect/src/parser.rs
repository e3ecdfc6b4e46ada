//! Frame decoding down to the transport layer
//!
//! Every length is checked before the corresponding field is read: frames come from
//! a best-effort capture and may be truncated or forged. Anything that cannot be
//! decoded safely is dropped without error.

use pnet_packet::ethernet::{EtherTypes, EthernetPacket};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::{Ipv4Flags, Ipv4Packet};
use pnet_packet::tcp::{TcpFlags, TcpPacket};
use pnet_packet::vlan::VlanPacket;
use pnet_packet::Packet;
use std::net::Ipv4Addr;
use tracing::trace;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const VLAN_HEADER_LEN: usize = 18;
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const TCP_MIN_HEADER_LEN: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedIpv4Packet {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: IpNextHeaderProtocol,
    /// Set for the first fragment of a fragmented datagram. Later fragments are
    /// never decoded.
    pub fragmented: bool,
    /// Offset of the transport header, from the start of the frame
    pub payload_offset: usize,
    /// Length of the transport data available in the frame
    pub payload_len: usize,
}

/// TCP control bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TcpControl {
    pub syn: bool,
    pub ack: bool,
    pub rst: bool,
    pub fin: bool,
    pub psh: bool,
    pub urg: bool,
}

impl TcpControl {
    /// SYN set, ACK/RST/FIN/PSH clear: a connection probe
    pub fn is_pure_syn(&self) -> bool {
        self.syn && !(self.ack || self.rst || self.fin || self.psh)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTcpSegment {
    pub src_port: u16,
    pub dst_port: u16,
    pub control: TcpControl,
    pub header_len: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedFrame {
    pub ipv4: ParsedIpv4Packet,
    /// Present when the protocol is TCP
    pub tcp: Option<ParsedTcpSegment>,
}

impl ParsedFrame {
    #[inline]
    pub fn is_icmp(&self) -> bool {
        self.ipv4.protocol == IpNextHeaderProtocols::Icmp
    }
}

/// Decode an Ethernet frame (optionally carrying one 802.1Q tag) holding IPv4
///
/// Returns `None` for non-IPv4 traffic, non-first fragments, and malformed or
/// truncated frames.
pub fn parse_frame(data: &[u8]) -> Option<ParsedFrame> {
    let eth = EthernetPacket::new(data)?;
    let (ethertype, l2_len) = match eth.get_ethertype() {
        EtherTypes::Vlan => {
            if data.len() < VLAN_HEADER_LEN {
                trace!("truncated 802.1Q frame ({} bytes)", data.len());
                return None;
            }
            let vlan = VlanPacket::new(eth.payload())?;
            (vlan.get_ethertype(), VLAN_HEADER_LEN)
        }
        ethertype => (ethertype, ETHERNET_HEADER_LEN),
    };
    if ethertype != EtherTypes::Ipv4 {
        return None;
    }
    let ipv4 = parse_ipv4(data, l2_len)?;
    let tcp = if ipv4.protocol == IpNextHeaderProtocols::Tcp {
        // bounded by the captured bytes, not the IPv4 total length
        Some(parse_tcp(&data[ipv4.payload_offset..])?)
    } else {
        None
    };
    Some(ParsedFrame { ipv4, tcp })
}

fn parse_ipv4(data: &[u8], l2_len: usize) -> Option<ParsedIpv4Packet> {
    if data.len() < l2_len + IPV4_MIN_HEADER_LEN {
        trace!("truncated IPv4 header");
        return None;
    }
    let l3_data = &data[l2_len..];
    let ipv4 = Ipv4Packet::new(l3_data)?;
    let header_words = ipv4.get_header_length();
    if ipv4.get_version() != 4 || header_words < 5 {
        trace!(
            "invalid IPv4 header (version {}, ihl {})",
            ipv4.get_version(),
            header_words
        );
        return None;
    }
    let header_len = usize::from(header_words) * 4;
    if l3_data.len() < header_len {
        trace!("IPv4 options truncated");
        return None;
    }
    if ipv4.get_fragment_offset() != 0 {
        trace!("skipping non-first fragment");
        return None;
    }
    // remove link-layer padding, unless total length is unset (offloaded segments)
    let total_len = usize::from(ipv4.get_total_length());
    let l3_len = if total_len >= header_len {
        total_len.min(l3_data.len())
    } else {
        l3_data.len()
    };
    Some(ParsedIpv4Packet {
        src: ipv4.get_source(),
        dst: ipv4.get_destination(),
        protocol: ipv4.get_next_level_protocol(),
        fragmented: ipv4.get_flags() & Ipv4Flags::MoreFragments != 0,
        payload_offset: l2_len + header_len,
        payload_len: l3_len - header_len,
    })
}

fn parse_tcp(segment: &[u8]) -> Option<ParsedTcpSegment> {
    if segment.len() < TCP_MIN_HEADER_LEN {
        trace!("truncated TCP header");
        return None;
    }
    let tcp = TcpPacket::new(segment)?;
    let header_len = usize::from(tcp.get_data_offset()) * 4;
    if header_len < TCP_MIN_HEADER_LEN || header_len > segment.len() {
        trace!("invalid TCP data offset ({header_len})");
        return None;
    }
    let flags = tcp.get_flags();
    let control = TcpControl {
        syn: flags & TcpFlags::SYN != 0,
        ack: flags & TcpFlags::ACK != 0,
        rst: flags & TcpFlags::RST != 0,
        fin: flags & TcpFlags::FIN != 0,
        psh: flags & TcpFlags::PSH != 0,
        urg: flags & TcpFlags::URG != 0,
    };
    Some(ParsedTcpSegment {
        src_port: tcp.get_source(),
        dst_port: tcp.get_destination(),
        control,
        header_len,
    })
}

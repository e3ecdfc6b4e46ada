use crate::device::{select_device, DeviceInfo};
use crate::error::CaptureError;
use libsensor_tools::pcap_parser::Linktype;
use libsensor_tools::{CaptureContext, Config, Frame, FrameAnalyzer, Timestamp};
use pcap::{Active, Capture};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_FILTER: &str = "ip and (tcp or icmp)";

fn clamp_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn read_snaplen(config: &Config) -> i32 {
    clamp_i32(config.get_usize("live.snaplen").unwrap_or(65536)).max(1)
}

/// Read timeout in milliseconds. libpcap treats 0 as "block forever", which would
/// keep the stop flag from being checked, so the lower bound is 1.
fn read_timeout_ms(config: &Config) -> i32 {
    clamp_i32(config.get_usize("live.timeout_ms").unwrap_or(1000)).max(1)
}

/// Blocking live capture on one device, feeding a `FrameAnalyzer`
pub struct LiveCaptureEngine<A: FrameAnalyzer> {
    analyzer: A,

    cap: Capture<Active>,
    device: DeviceInfo,
    ctx: CaptureContext,
}

impl<A: FrameAnalyzer> LiveCaptureEngine<A> {
    /// Open device number `index` (1-based, libpcap enumeration order)
    pub fn new(index: usize, analyzer: A, config: &Config) -> Result<Self, CaptureError> {
        let devices = pcap::Device::list().map_err(CaptureError::DeviceList)?;
        let infos: Vec<DeviceInfo> = devices.iter().map(DeviceInfo::from).collect();
        let i = select_device(index, &infos)?;
        let device = infos[i].clone();

        let snaplen = read_snaplen(config);
        let promisc = config.get_bool("live.promisc").unwrap_or(true);
        let timeout = read_timeout_ms(config);
        let filter = config.get("live.filter").unwrap_or(DEFAULT_FILTER);

        info!("Capturing on device {index}: {device}");
        let mut cap = Capture::from_device(devices[i].clone())?
            .snaplen(snaplen)
            .promisc(promisc)
            .timeout(timeout)
            .open()?;

        let link_type = Linktype(cap.get_datalink().0);
        if link_type != Linktype::ETHERNET {
            return Err(CaptureError::UnsupportedLinkType(link_type.0));
        }

        if !filter.is_empty() {
            match cap.filter(filter, true) {
                Ok(()) => debug!("capture filter: {filter}"),
                Err(e) => warn!("Could not install capture filter '{filter}' ({e}), capturing unfiltered"),
            }
        }

        Ok(LiveCaptureEngine {
            analyzer,
            cap,
            device,
            ctx: CaptureContext::default(),
        })
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut A {
        &mut self.analyzer
    }

    /// Capture until `stop` is set, or a fatal capture error occurs
    ///
    /// `stop` is checked between frames and on every read timeout.
    pub fn run(&mut self, stop: Arc<AtomicBool>) -> Result<(), CaptureError> {
        self.analyzer.init()?;
        debug!("Live mode: waiting for packets");
        let mut result = Ok(());
        while !stop.load(Ordering::SeqCst) {
            match self.cap.next_packet() {
                Ok(packet) => {
                    let header = packet.header;
                    let ts = Timestamp::new(header.ts.tv_sec as u32, header.ts.tv_usec as u32);
                    let frame_index = self.ctx.update(ts);
                    let frame = Frame {
                        ts,
                        link_type: Linktype::ETHERNET,
                        data: packet.data,
                        caplen: header.caplen,
                        origlen: header.len,
                        frame_index,
                    };
                    if let Err(e) = self.analyzer.handle_frame(&frame, &self.ctx) {
                        result = Err(e.into());
                        break;
                    }
                }
                Err(pcap::Error::TimeoutExpired) => {
                    trace!("read timeout");
                    continue;
                }
                Err(e) => {
                    error!("Live mode: getting next packet failed: {e}");
                    result = Err(e.into());
                    break;
                }
            }
        }
        debug!("Live mode: capture loop ended");

        match self.cap.stats() {
            Ok(stats) => info!(
                "Capture: {} received, {} dropped, {} dropped by interface",
                stats.received, stats.dropped, stats.if_dropped
            ),
            Err(e) => debug!("Could not get capture statistics: {e}"),
        }
        self.analyzer.teardown();
        result
    }
}

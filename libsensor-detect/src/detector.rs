use crate::alert::{Alert, Protocol, Severity};
use crate::classify::remote_endpoint;
use crate::config::DetectionConfig;
use crate::dns::{DnsEnrichment, NoLookup, ReverseResolver, SystemResolver};
use crate::icmp::IcmpFloodDetector;
use crate::output::AlertEmitter;
use crate::parser::{parse_frame, ParsedIpv4Packet, ParsedTcpSegment};
use crate::policy::{PortPolicy, PortVerdict};
use crate::scan::ScanDetector;
use libsensor_tools::{CaptureContext, Error, FlowKey, Frame, FrameAnalyzer, Timestamp};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetectorStats {
    pub frames: usize,
    pub ipv4: usize,
    pub tcp: usize,
    pub icmp: usize,
    pub alerts_medium: usize,
    pub alerts_high: usize,
    pub alerts_critical: usize,
}

impl DetectorStats {
    fn count_alert(&mut self, severity: Severity) {
        match severity {
            Severity::Medium => self.alerts_medium += 1,
            Severity::High => self.alerts_high += 1,
            Severity::Critical => self.alerts_critical += 1,
        }
    }

    pub fn alerts(&self) -> usize {
        self.alerts_medium + self.alerts_high + self.alerts_critical
    }
}

/// The detection engine
///
/// Owns all per-flow state (scan records, ICMP counters, DNS cache). Frames are
/// processed one at a time, to completion: decode, detect, then enrich and emit
/// when a detector fires.
pub struct Detector {
    scan: ScanDetector,
    icmp: IcmpFloodDetector,
    policy: PortPolicy,
    dns: DnsEnrichment,
    emitter: AlertEmitter,
    stats: DetectorStats,
}

impl Detector {
    pub fn new(
        config: &DetectionConfig,
        resolver: Box<dyn ReverseResolver>,
        emitter: AlertEmitter,
    ) -> Self {
        Detector {
            scan: ScanDetector::new(
                config.syn_threshold,
                config.syn_window,
                config.max_tracked_flows,
            ),
            icmp: IcmpFloodDetector::new(
                config.icmp_threshold,
                config.icmp_window,
                config.icmp_exempt_private,
                config.max_tracked_flows,
            ),
            policy: PortPolicy::new(config.safe_ports.iter().copied()),
            dns: DnsEnrichment::new(resolver, config.dns_ttl, config.dns_cache_size),
            emitter,
            stats: DetectorStats::default(),
        }
    }

    /// Build a detector with the system resolver and the configured sinks
    pub fn from_config(config: &DetectionConfig) -> Self {
        let resolver: Box<dyn ReverseResolver> = if config.dns_enabled {
            match SystemResolver::new(config.dns_timeout) {
                Ok(resolver) => Box::new(resolver),
                Err(e) => {
                    warn!("Could not create DNS resolver ({e}), host names will stay numeric");
                    Box::new(NoLookup)
                }
            }
        } else {
            Box::new(NoLookup)
        };
        let mut emitter = AlertEmitter::new();
        if config.alert_stdout {
            emitter.add_stdout();
        }
        if let Some(path) = &config.alert_log {
            // failure already reported, stdout keeps working
            let _ = emitter.add_log_file(path);
        }
        if emitter.sink_count() == 0 {
            warn!("No alert sink configured, alerts will be discarded");
        }
        Detector::new(config, resolver, emitter)
    }

    /// Process one raw Ethernet frame captured at `ts`
    ///
    /// Returns the alert raised by this frame, if any.
    pub fn process(&mut self, data: &[u8], ts: Timestamp) -> Option<Alert> {
        self.stats.frames += 1;
        let parsed = parse_frame(data)?;
        self.stats.ipv4 += 1;
        if let Some(tcp) = &parsed.tcp {
            self.stats.tcp += 1;
            self.handle_tcp(&parsed.ipv4, tcp, ts)
        } else if parsed.is_icmp() {
            self.stats.icmp += 1;
            self.handle_icmp(&parsed.ipv4, ts)
        } else {
            None
        }
    }

    fn handle_tcp(
        &mut self,
        ip: &ParsedIpv4Packet,
        tcp: &ParsedTcpSegment,
        ts: Timestamp,
    ) -> Option<Alert> {
        // scan detection takes precedence over port policy
        if tcp.control.is_pure_syn() {
            let key = FlowKey::new(ip.src, ip.dst);
            let count = self.scan.on_pure_syn(key, ts)?;
            let desc = format!(
                "TCP SYN flood/scan detected from {} to {} ({} probes)",
                ip.src, ip.dst, count
            );
            return Some(self.raise(ip, Protocol::Tcp, Severity::Critical, desc, ts));
        }
        let verdict = self.policy.classify(tcp.dst_port, &tcp.control);
        let desc = match verdict {
            PortVerdict::Ssh => "Potential SSH connection detected to port 22".to_owned(),
            PortVerdict::Rdp => "Potential RDP connection detected to port 3389".to_owned(),
            PortVerdict::Reset => format!("RST observed on port {} from {}", tcp.dst_port, ip.src),
            PortVerdict::Safe | PortVerdict::Ignore => return None,
        };
        let severity = verdict.severity()?;
        Some(self.raise(ip, Protocol::Tcp, severity, desc, ts))
    }

    fn handle_icmp(&mut self, ip: &ParsedIpv4Packet, ts: Timestamp) -> Option<Alert> {
        let key = FlowKey::new(ip.src, ip.dst);
        let count = self.icmp.on_icmp(key, ts)?;
        debug!("ICMP flood from {key}: {count} packets");
        let desc = format!(
            "High ICMP traffic detected (possible ping flood) from {}",
            ip.src
        );
        Some(self.raise(ip, Protocol::Icmp, Severity::Medium, desc, ts))
    }

    fn raise(
        &mut self,
        ip: &ParsedIpv4Packet,
        proto: Protocol,
        severity: Severity,
        desc: String,
        ts: Timestamp,
    ) -> Alert {
        let host = self.dns.resolve(remote_endpoint(ip.src, ip.dst), ts);
        let alert = Alert::new(ts, ip.src, ip.dst, proto, severity, desc).with_host(host);
        self.emitter.emit(&alert);
        self.stats.count_alert(severity);
        alert
    }

    pub fn stats(&self) -> &DetectorStats {
        &self.stats
    }

    pub fn scan_detector(&self) -> &ScanDetector {
        &self.scan
    }

    pub fn icmp_detector(&self) -> &IcmpFloodDetector {
        &self.icmp
    }

    pub fn dns(&self) -> &DnsEnrichment {
        &self.dns
    }

    pub fn emitter(&self) -> &AlertEmitter {
        &self.emitter
    }
}

impl FrameAnalyzer for Detector {
    fn handle_frame(&mut self, frame: &Frame, _ctx: &CaptureContext) -> Result<(), Error> {
        self.process(frame.captured(), frame.ts);
        Ok(())
    }

    fn teardown(&mut self) {
        let s = &self.stats;
        info!("Detector: {} frames, {} IPv4 ({} TCP, {} ICMP)", s.frames, s.ipv4, s.tcp, s.icmp);
        info!(
            "Detector: {} alerts ({} critical, {} high, {} medium)",
            s.alerts(),
            s.alerts_critical,
            s.alerts_high,
            s.alerts_medium
        );
        info!(
            "Detector: {} DNS lookups, {} cached hosts, {} tracked SYN flows",
            self.dns.lookups(),
            self.dns.len(),
            self.scan.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    fn detector() -> Detector {
        Detector::new(&DetectionConfig::default(), Box::new(NoLookup), AlertEmitter::new())
    }

    #[test]
    fn detector_counts_frames() {
        let mut d = detector();
        let ts = Timestamp::new(1, 0);
        d.process(&[0u8; 10], ts);
        d.process(&FrameBuilder::tcp([10, 0, 0, 1], [1, 1, 1, 1], 1, 80).build(), ts);
        d.process(&FrameBuilder::icmp([10, 0, 0, 1], [1, 1, 1, 1]).build(), ts);
        let s = d.stats();
        assert_eq!((s.frames, s.ipv4, s.tcp, s.icmp), (3, 2, 1, 1));
        assert_eq!(s.alerts(), 0);
    }

    #[test]
    fn syn_to_ssh_is_a_probe() {
        let mut d = detector();
        let frame = FrameBuilder::tcp([203, 0, 113, 1], [10, 0, 0, 1], 5000, 22)
            .flags(SYN)
            .build();
        assert!(d.process(&frame, Timestamp::new(1, 0)).is_none());
        assert_eq!(d.scan_detector().len(), 1);
    }

    #[test]
    fn numeric_host_without_dns() {
        let mut d = detector();
        let frame = FrameBuilder::tcp([10, 0, 0, 1], [198, 51, 100, 7], 5000, 3389).build();
        let alert = d.process(&frame, Timestamp::new(1, 0)).expect("rdp alert");
        assert_eq!(alert.host.as_deref(), Some("198.51.100.7"));
    }
}

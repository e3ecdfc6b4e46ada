use crate::classify::is_private;
use fnv::FnvHashMap;
use libsensor_tools::{FlowKey, Timestamp};
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_ICMP_THRESHOLD: u32 = 3;
pub const DEFAULT_ICMP_WINDOW: Duration = Duration::from_secs(5);

/// ICMP flood detector
///
/// Unlike the scan detector, all counters share one window: when it expires every
/// counter is cleared at once.
pub struct IcmpFloodDetector {
    counters: FnvHashMap<FlowKey, u32>,
    threshold: u32,
    window_ms: u64,
    exempt_private: bool,
    last_cleanup: Option<Timestamp>,
    max_tracked: usize,
}

impl Default for IcmpFloodDetector {
    fn default() -> Self {
        IcmpFloodDetector::new(DEFAULT_ICMP_THRESHOLD, DEFAULT_ICMP_WINDOW, false, usize::MAX)
    }
}

impl IcmpFloodDetector {
    pub fn new(threshold: u32, window: Duration, exempt_private: bool, max_tracked: usize) -> Self {
        IcmpFloodDetector {
            counters: FnvHashMap::default(),
            threshold,
            window_ms: window.as_millis() as u64,
            exempt_private,
            last_cleanup: None,
            max_tracked,
        }
    }

    /// Account for an ICMP packet of flow `key` seen at `now`
    ///
    /// Returns the packet count when the threshold is exceeded.
    pub fn on_icmp(&mut self, key: FlowKey, now: Timestamp) -> Option<u32> {
        match self.last_cleanup {
            None => self.last_cleanup = Some(now),
            Some(last) => {
                if now.millis_since(last) > self.window_ms {
                    self.reset(now);
                }
            }
        }
        if self.exempt_private && is_private(key.src) {
            trace!("ICMP from private source {} ignored", key.src);
            return None;
        }
        if self.counters.len() >= self.max_tracked && !self.counters.contains_key(&key) {
            // tracked flows keep their counts until the next global reset
            debug!("ICMP table full ({} flows), not tracking {key}", self.counters.len());
            return None;
        }
        let counter = self.counters.entry(key).or_insert(0);
        *counter += 1;
        if *counter > self.threshold {
            let count = *counter;
            *counter = 0;
            Some(count)
        } else {
            None
        }
    }

    fn reset(&mut self, now: Timestamp) {
        self.counters.clear();
        self.last_cleanup = Some(now);
    }

    pub fn count(&self, key: &FlowKey) -> u32 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn public_key() -> FlowKey {
        FlowKey::new(Ipv4Addr::new(198, 51, 100, 1), Ipv4Addr::new(10, 0, 0, 1))
    }

    fn private_key() -> FlowKey {
        FlowKey::new(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 1))
    }

    #[test]
    fn icmp_flood_threshold() {
        let mut icmp = IcmpFloodDetector::default();
        let now = Timestamp::new(10, 0);
        let fired: Vec<_> = (0..8).map(|_| icmp.on_icmp(public_key(), now)).collect();
        assert_eq!(
            fired,
            vec![None, None, None, Some(4), None, None, None, Some(4)]
        );
    }

    #[test]
    fn icmp_global_reset() {
        let mut icmp = IcmpFloodDetector::default();
        let t0 = Timestamp::new(10, 0);
        for _ in 0..3 {
            assert_eq!(icmp.on_icmp(public_key(), t0), None);
        }
        icmp.on_icmp(private_key(), t0);
        // not yet expired
        let t1 = t0.add(DEFAULT_ICMP_WINDOW);
        assert_eq!(icmp.count(&private_key()), 1);
        assert_eq!(icmp.on_icmp(private_key(), t1), None);
        assert_eq!(icmp.count(&private_key()), 2);
        // any packet after the window clears every counter
        let t2 = t0.add(DEFAULT_ICMP_WINDOW + Duration::from_millis(1));
        assert_eq!(icmp.on_icmp(private_key(), t2), None);
        assert_eq!(icmp.count(&public_key()), 0);
        assert_eq!(icmp.count(&private_key()), 1);
        assert_eq!(icmp.on_icmp(public_key(), t2), None);
    }

    #[test]
    fn icmp_private_exemption() {
        let mut icmp = IcmpFloodDetector::new(3, DEFAULT_ICMP_WINDOW, true, usize::MAX);
        let now = Timestamp::new(10, 0);
        for _ in 0..10 {
            assert_eq!(icmp.on_icmp(private_key(), now), None);
        }
        assert!(icmp.is_empty());
        let fired = (0..4).filter_map(|_| icmp.on_icmp(public_key(), now)).count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn icmp_table_cap_keeps_tracked_counts() {
        let mut icmp = IcmpFloodDetector::new(3, DEFAULT_ICMP_WINDOW, false, 2);
        let now = Timestamp::new(10, 0);
        let victim = Ipv4Addr::new(10, 0, 0, 1);
        icmp.on_icmp(public_key(), now);
        icmp.on_icmp(public_key(), now);
        // spoofed sources fill the table, then get refused
        for i in 0..100u32 {
            let spoofed = FlowKey::new(Ipv4Addr::from(0x0b00_0000 + i), victim);
            assert_eq!(icmp.on_icmp(spoofed, now), None);
        }
        assert_eq!(icmp.len(), 2);
        assert_eq!(icmp.count(&public_key()), 2);
        icmp.on_icmp(public_key(), now);
        assert_eq!(icmp.on_icmp(public_key(), now), Some(4));
        // the global window still clears the table
        let later = now.add(DEFAULT_ICMP_WINDOW + Duration::from_millis(1));
        icmp.on_icmp(private_key(), later);
        assert_eq!(icmp.len(), 1);
        assert_eq!(icmp.count(&private_key()), 1);
    }
}

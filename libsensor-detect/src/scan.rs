use fnv::FnvHashMap;
use libsensor_tools::{FlowKey, Timestamp};
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_SYN_THRESHOLD: u32 = 10;
pub const DEFAULT_SYN_WINDOW: Duration = Duration::from_millis(5000);

/// Pure-SYN probe count of one flow, in its current window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanRecord {
    pub count: u32,
    pub window_start: Timestamp,
}

/// Per-flow SYN scan / SYN flood detector
///
/// Each flow has its own window, anchored at the first probe and restarted once
/// expired. When the count exceeds the threshold the detector fires and the count
/// drops to zero, so a sustained scanner fires again every `threshold + 1` probes.
pub struct ScanDetector {
    records: FnvHashMap<FlowKey, ScanRecord>,
    threshold: u32,
    window_ms: u64,
    max_tracked: usize,
    last_purge: Option<Timestamp>,
    purges: usize,
}

impl Default for ScanDetector {
    fn default() -> Self {
        ScanDetector::new(DEFAULT_SYN_THRESHOLD, DEFAULT_SYN_WINDOW, usize::MAX)
    }
}

impl ScanDetector {
    pub fn new(threshold: u32, window: Duration, max_tracked: usize) -> Self {
        ScanDetector {
            records: FnvHashMap::default(),
            threshold,
            window_ms: window.as_millis() as u64,
            max_tracked,
            last_purge: None,
            purges: 0,
        }
    }

    /// Account for a pure-SYN segment of flow `key` seen at `now`
    ///
    /// Returns the probe count when the threshold is exceeded.
    ///
    /// When the table is full, stale records are purged at most once per window;
    /// if every record is still active the new flow is not tracked.
    pub fn on_pure_syn(&mut self, key: FlowKey, now: Timestamp) -> Option<u32> {
        if self.records.len() >= self.max_tracked && !self.records.contains_key(&key) {
            let purge_due = self
                .last_purge
                .map_or(true, |last| now.millis_since(last) > self.window_ms);
            if purge_due {
                self.purge(now);
            }
            if self.records.len() >= self.max_tracked {
                trace!("scan table full, not tracking {key}");
                return None;
            }
        }
        let window_ms = self.window_ms;
        let record = self.records.entry(key).or_default();
        if record.count == 0 || now.millis_since(record.window_start) > window_ms {
            record.count = 1;
            record.window_start = now;
        } else {
            record.count += 1;
        }
        if record.count > self.threshold {
            let count = record.count;
            record.count = 0;
            Some(count)
        } else {
            None
        }
    }

    /// Drop records that would restart on their next probe anyway
    fn purge(&mut self, now: Timestamp) {
        let window_ms = self.window_ms;
        let before = self.records.len();
        self.records
            .retain(|_, r| r.count != 0 && now.millis_since(r.window_start) <= window_ms);
        self.last_purge = Some(now);
        self.purges += 1;
        debug!(
            "scan table full: purged {} of {} records",
            before - self.records.len(),
            before
        );
    }

    /// Number of table purges performed
    pub fn purges(&self) -> usize {
        self.purges
    }

    pub fn record(&self, key: &FlowKey) -> Option<&ScanRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

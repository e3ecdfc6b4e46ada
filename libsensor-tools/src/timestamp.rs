use std::time::Duration;

pub const MICROS_PER_SEC: u32 = 1_000_000;

/// Capture timestamp of a frame
///
/// Panic-free replacement for `std::time::SystemTime`, matching what capture
/// formats provide:
///   - seconds and microseconds since the epoch, fields exposed
///   - elapsed-time computations saturate instead of failing when time goes backwards
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Timestamp {
    pub secs: u32,
    pub micros: u32,
}

impl Timestamp {
    /// Build Timestamp from secs and micros. Excess micros are carried into secs.
    pub fn new(secs: u32, micros: u32) -> Timestamp {
        Timestamp {
            secs: secs.wrapping_add(micros / MICROS_PER_SEC),
            micros: micros % MICROS_PER_SEC,
        }
    }

    /// Test if Timestamp object is null
    #[inline]
    pub fn is_null(self) -> bool {
        self.secs == 0 && self.micros == 0
    }

    #[inline]
    fn as_micros(self) -> u64 {
        u64::from(self.secs) * u64::from(MICROS_PER_SEC) + u64::from(self.micros)
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.as_micros().saturating_sub(earlier.as_micros()))
    }

    /// Milliseconds elapsed since `earlier`, or zero if `earlier` is in the future
    #[inline]
    pub fn millis_since(self, earlier: Timestamp) -> u64 {
        self.as_micros().saturating_sub(earlier.as_micros()) / 1000
    }

    /// Return this timestamp shifted forward by `d`
    pub fn add(self, d: Duration) -> Timestamp {
        let micros = self.as_micros().saturating_add(d.as_micros() as u64);
        let secs = (micros / u64::from(MICROS_PER_SEC)).min(u64::from(u32::MAX)) as u32;
        Timestamp {
            secs,
            micros: (micros % u64::from(MICROS_PER_SEC)) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;
    use std::time::Duration;

    #[test]
    fn timestamp_elapsed() {
        let t1 = Timestamp::new(1234, 5678);
        let t2 = Timestamp::new(1239, 6789);
        assert_eq!(t2.millis_since(t1), 5001);
        assert_eq!(t2.saturating_since(t1), Duration::from_micros(5_001_111));
        // time going backwards is not an error
        assert_eq!(t1.millis_since(t2), 0);
    }

    #[test]
    fn timestamp_carry() {
        let t = Timestamp::new(10, 2_500_000);
        assert_eq!(t, Timestamp { secs: 12, micros: 500_000 });
        let t = t.add(Duration::from_millis(600));
        assert_eq!(t, Timestamp { secs: 13, micros: 100_000 });
    }
}

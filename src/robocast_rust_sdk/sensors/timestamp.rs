use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub nanos: u64,
}

impl Timestamp {
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Returns `None` for stamps before the epoch.
    #[inline]
    pub fn from_sec_nsec(sec: i32, nsec: u32) -> Option<Self> {
        let sec = u64::try_from(sec).ok()?;
        Some(Self {
            nanos: sec * NANOS_PER_SEC + nsec as u64,
        })
    }

    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        let sec = self.nanos / NANOS_PER_SEC;
        let nsec = self.nanos % NANOS_PER_SEC;
        sec as f64 + nsec as f64 * 1e-9
    }

    /// `(sec, nsec)` as carried by a message header, `None` once `sec` no longer fits an `i32`.
    #[inline]
    pub fn get_sec_nsec(&self) -> Option<(i32, u32)> {
        let sec = self.nanos / NANOS_PER_SEC;
        let remainder = self.nanos - sec * NANOS_PER_SEC;
        let sec = i32::try_from(sec).ok()?;
        Some((sec, remainder as u32))
    }

    /// Is self before other
    #[inline]
    pub fn is_before(&self, other: &Self) -> bool {
        self.nanos < other.nanos
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.nanos)
    }
}

/// Tracks the last stamp seen on one topic and reports regressions.
#[derive(Debug, Default)]
pub(crate) struct MonotonicCheck {
    last: Option<Timestamp>,
    regressions: usize,
}

impl MonotonicCheck {
    /// Returns the previous stamp when `stamp` goes backwards.
    pub(crate) fn observe(&mut self, stamp: Timestamp) -> Option<Timestamp> {
        let previous = self.last.replace(stamp);
        match previous {
            Some(prev) if stamp.is_before(&prev) => {
                self.regressions += 1;
                Some(prev)
            }
            _ => None,
        }
    }

    pub(crate) fn regressions(&self) -> usize {
        self.regressions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sec_nsec_round_trip() {
        let t = Timestamp::from_sec_nsec(1748443589, 84976896).unwrap();
        assert_eq!(t.as_nanos(), 1748443589084976896);
        assert_eq!(t.get_sec_nsec(), Some((1748443589, 84976896)));
    }

    #[test]
    fn negative_seconds_are_rejected() {
        assert!(Timestamp::from_sec_nsec(-1, 0).is_none());
    }

    #[test]
    fn seconds_past_i32_do_not_wrap() {
        let last = Timestamp::from_nanos(i32::MAX as u64 * NANOS_PER_SEC + 999_999_999);
        assert_eq!(last.get_sec_nsec(), Some((i32::MAX, 999_999_999)));

        let overflow = Timestamp::from_nanos((i32::MAX as u64 + 1) * NANOS_PER_SEC);
        assert_eq!(overflow.get_sec_nsec(), None);
        assert!(super::super::header::Header::new(overflow, "imu_link").is_none());
    }

    #[test]
    fn seconds_keep_sub_microsecond_part() {
        let t = Timestamp::from_nanos(1_500_000_001);
        assert!((t.as_secs_f64() - 1.500000001).abs() < 1e-12);
    }

    #[test]
    fn monotonic_check_counts_regressions() {
        let mut check = MonotonicCheck::default();
        assert_eq!(check.observe(Timestamp::from_nanos(100)), None);
        assert_eq!(check.observe(Timestamp::from_nanos(100)), None);
        assert_eq!(
            check.observe(Timestamp::from_nanos(50)),
            Some(Timestamp::from_nanos(100))
        );
        assert_eq!(check.observe(Timestamp::from_nanos(200)), None);
        assert_eq!(check.regressions(), 1);
    }
}

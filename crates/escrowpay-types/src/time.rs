//! Timestamp type used by agreements and receipts.
//!
//! Timestamps are Unix epoch seconds (UTC). The program never reads the
//! wall clock itself; the current time is supplied by the host on every
//! instruction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    #[must_use]
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Current wall-clock time. Pre-epoch clocks clamp to [`Timestamp::EPOCH`].
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        u64::try_from(dt.timestamp()).map_or(Self::EPOCH, Self)
    }

    #[must_use]
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Whether `self` has been reached at `now` (inclusive).
    #[must_use]
    pub fn is_reached_at(&self, now: Timestamp) -> bool {
        now.0 >= self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reached_is_inclusive() {
        let deadline = Timestamp::new(100);
        assert!(!deadline.is_reached_at(Timestamp::new(99)));
        assert!(deadline.is_reached_at(Timestamp::new(100)));
        assert!(deadline.is_reached_at(Timestamp::new(101)));
    }

    #[test]
    fn from_datetime_clamps_pre_epoch() {
        let dt = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(Timestamp::from_datetime(dt), Timestamp::new(1_700_000_000));
        let before = DateTime::from_timestamp(-5, 0).unwrap();
        assert_eq!(Timestamp::from_datetime(before), Timestamp::EPOCH);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(Timestamp::now() > Timestamp::new(1_577_836_800));
    }

    #[test]
    fn display_has_unit() {
        assert_eq!(format!("{}", Timestamp::new(42)), "42s");
    }
}

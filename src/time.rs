/*! Time structures.

The engine never reads a clock itself. Every dispatch is handed the current
[Instant] by whoever drives it, and every retransmission interval, offer
window and lease length is a [Duration] counted from such an instant.

Both types keep whole milliseconds, which is finer than anything DHCP
timing needs.
*/

use core::{fmt, ops};

/// A point on the caller's monotonic clock, in milliseconds since an
/// arbitrary origin such as system startup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    millis: i64,
}

impl Instant {
    pub const ZERO: Instant = Instant { millis: 0 };

    pub const fn from_millis(millis: i64) -> Instant {
        Instant { millis }
    }

    pub const fn from_secs(secs: i64) -> Instant {
        Instant {
            millis: secs * 1000,
        }
    }

    /// The current wall-clock time.
    #[cfg(feature = "std")]
    pub fn now() -> Instant {
        let elapsed = ::std::time::SystemTime::now()
            .duration_since(::std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Instant::from_millis(elapsed.as_millis() as i64)
    }

    /// Whole seconds since the origin.
    pub const fn secs(&self) -> i64 {
        self.millis.div_euclid(1000)
    }

    /// The millisecond part, `0..1000`.
    pub const fn millis(&self) -> i64 {
        self.millis.rem_euclid(1000)
    }

    pub const fn total_millis(&self) -> i64 {
        self.millis
    }

    /// How long ago `earlier` was; zero if it has not happened yet.
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        let millis = self.millis.saturating_sub(earlier.millis);
        Duration::from_millis(millis.max(0) as u64)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}s", self.secs(), self.millis())
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        let millis = i64::try_from(rhs.millis).unwrap_or(i64::MAX);
        Instant::from_millis(self.millis.saturating_add(millis))
    }
}

impl ops::AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

/// A non-negative span of time, in milliseconds.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    millis: u64,
}

impl Duration {
    pub const ZERO: Duration = Duration { millis: 0 };

    pub const fn from_millis(millis: u64) -> Duration {
        Duration { millis }
    }

    pub const fn from_secs(secs: u64) -> Duration {
        Duration {
            millis: secs.saturating_mul(1000),
        }
    }

    /// Whole seconds.
    pub const fn secs(&self) -> u64 {
        self.millis / 1000
    }

    /// The millisecond part, `0..1000`.
    pub const fn millis(&self) -> u64 {
        self.millis % 1000
    }

    pub const fn total_millis(&self) -> u64 {
        self.millis
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}s", self.secs(), self.millis())
    }
}

impl ops::Add<Duration> for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration::from_millis(self.millis.saturating_add(rhs.millis))
    }
}

impl ops::Sub<Duration> for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        Duration::from_millis(self.millis.saturating_sub(rhs.millis))
    }
}

impl From<::core::time::Duration> for Duration {
    fn from(other: ::core::time::Duration) -> Duration {
        Duration::from_millis(other.as_millis().try_into().unwrap_or(u64::MAX))
    }
}

impl From<Duration> for ::core::time::Duration {
    fn from(val: Duration) -> Self {
        ::core::time::Duration::from_millis(val.millis)
    }
}

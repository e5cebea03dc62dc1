use chrono::{DateTime, Duration, Utc};

/// Source of "now" for every timestamp the ledger writes.
///
/// Services hold a `Clock` instead of calling `Utc::now()` so that tests can pin
/// started, completion, and bookmark dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// A clock reading the system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// A clock that always reports `at`.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }

    /// A copy of this clock moved forward by `delta`; the system clock is unchanged.
    #[must_use]
    pub fn shifted(self, delta: Duration) -> Self {
        match self {
            Clock::System => Clock::System,
            Clock::Fixed(at) => Clock::Fixed(at + delta),
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns [`FIXED_TEST_TIMESTAMP`] as a `DateTime<Utc>`.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// A `Clock` pinned at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_shifts_forward() {
        let clock = fixed_clock().shifted(Duration::hours(2));
        assert_eq!(clock.now(), fixed_now() + Duration::hours(2));
        assert_eq!(Clock::system().shifted(Duration::hours(2)), Clock::System);
    }
}

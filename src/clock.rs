use chrono::{DateTime, FixedOffset, Local};

/// Source of "now" for date comparisons and stored timestamps.
///
/// Everything that reads the current time goes through this trait so tests can
/// pin the clock to a literal instant and assert exact dates.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<FixedOffset>);

#[cfg(test)]
impl FixedClock {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self(instant)
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

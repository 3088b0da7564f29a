//! Clock abstraction so session timestamps and time limits stay testable.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Whole seconds elapsed between `earlier` and now. Negative when
    /// `earlier` lies in the future.
    fn seconds_since(&self, earlier: DateTime<Utc>) -> i64 {
        (self.now() - earlier).num_seconds()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

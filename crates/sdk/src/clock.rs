//! Time source for services
//!
//! Financial functions never read the clock themselves; services ask a
//! [`Clock`] and pass `now` down explicitly.

/// Source of the current unix timestamp in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

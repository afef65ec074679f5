//! Injectable time source.
//!
//! Epoch bucketing makes rate-limit behavior time-dependent, so the clock
//! is a collaborator rather than an ambient call. Production uses
//! [`SystemClock`]; tests use a fixed or stepping clock to walk epoch
//! boundaries deterministically.

/// A source of the current time, in Unix seconds.
pub trait Clock: Send + Sync {
    /// Current time as seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Wall-clock time via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock pinned to a settable instant, for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `now` seconds.
    pub fn new(now: i64) -> Self {
        Self {
            now: std::sync::atomic::AtomicI64::new(now),
        }
    }

    /// Advance the clock by `secs` seconds.
    pub fn advance(&self, secs: i64) {
        self.now
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, now: i64) {
        self.now.store(now, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(61);
        assert_eq!(clock.now(), 161);
        clock.set(0);
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn test_system_clock_is_sane() {
        // 2020-01-01 as a lower bound.
        assert!(SystemClock.now() > 1_577_836_800);
    }
}

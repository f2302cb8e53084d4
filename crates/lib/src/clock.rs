//! Time provider abstraction
//!
//! Every timestamp in the vault (lockout expiries, session lifetimes, throttle
//! windows, audit rows) is read through the [`Clock`] trait, so production code
//! uses real system time while tests drive a controllable clock through lockout
//! and expiry boundaries.

use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

/// A time provider for current timestamps.
///
/// Implementations must be cheap to call; the login path reads the clock
/// several times per request.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Returns the current time as an RFC3339-formatted string.
    fn now_rfc3339(&self) -> String;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn now_rfc3339(&self) -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

/// Test clock frozen at an explicit instant.
///
/// The clock never moves on its own; tests move it with [`advance`](Self::advance)
/// or [`set`](Self::set). Freezing keeps boundary assertions exact: a session
/// issued at `t` with a 24h ttl is checked against precisely `t + 24h`, with no
/// drift from intermediate reads.
///
/// # Example
///
/// ```
/// use portcullis::{Clock, FixedClock};
/// use std::time::Duration;
///
/// let clock = FixedClock::new(1_000);
/// assert_eq!(clock.now_millis(), 1_000);
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(clock.now_millis(), 61_000);
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    millis: Mutex<i64>,
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a fixed clock at the given time in milliseconds since epoch.
    pub fn new(millis: i64) -> Self {
        Self {
            millis: Mutex::new(millis),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.millis.lock().unwrap() += by.as_millis() as i64;
    }

    /// Set the clock to a specific time in milliseconds since epoch.
    pub fn set(&self, millis: i64) {
        *self.millis.lock().unwrap() = millis;
    }

    /// Read the current time without going through the trait.
    pub fn get(&self) -> i64 {
        *self.millis.lock().unwrap()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        *self.millis.lock().unwrap()
    }

    fn now_rfc3339(&self) -> String {
        use chrono::{TimeZone, Utc};
        let millis = self.now_millis();
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string())
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1_704_067_200_000)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clone for FixedClock {
    fn clone(&self) -> Self {
        // Independent clock starting at the current value
        Self::new(self.get())
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedClock")
            .field("millis", &self.get())
            .finish()
    }
}

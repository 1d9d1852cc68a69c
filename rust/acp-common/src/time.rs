//! Wall-clock helpers.

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current time as whole seconds since the Unix epoch.
///
/// A clock set before 1970 reads as negative seconds.
pub fn unix_now() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |s| -s),
    }
}

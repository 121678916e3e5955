//! When a scheduled check-in should open.

use chrono::{DateTime, Duration, Utc};

/// Default lead time before the scheduled check-in at which the flow opens.
pub const DEFAULT_DUE_WINDOW_MINUTES: i64 = 30;

/// True once `now` is within `window` of `checkin_time` (or past it).
pub fn is_checkin_due(checkin_time: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now + window > checkin_time
}

/// Parse a stored check-in time. Anything that is not RFC 3339 is treated as
/// unscheduled.
pub fn parse_checkin_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

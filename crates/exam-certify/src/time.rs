//! Time utilities for exam-certify.
//!
//! All timestamps are Unix epoch microseconds (u64).

/// Microseconds per second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Default exam window: 3 days.
pub const DEFAULT_EXAM_WINDOW_SECS: u64 = 3 * 24 * 60 * 60;

/// Return the current time as microseconds since Unix epoch.
pub fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Convert whole seconds to microseconds, saturating.
pub fn secs_to_micros(secs: u64) -> u64 {
    secs.saturating_mul(MICROS_PER_SEC)
}

/// Convert microseconds to an RFC 3339 string.
pub fn micros_to_rfc3339(micros: u64) -> String {
    let secs = (micros / MICROS_PER_SEC) as i64;
    let nsecs = ((micros % MICROS_PER_SEC) * 1000) as u32;
    let dt = chrono::DateTime::from_timestamp(secs, nsecs).unwrap_or(chrono::DateTime::UNIX_EPOCH);
    dt.to_rfc3339()
}

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Convert SystemTime to nanoseconds since UNIX_EPOCH.
///
/// Times before the epoch clamp to zero.
pub fn system_time_to_nanos(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos()
}

/// Encodes a modification time the way it is stored in place of a content
/// hash.
pub fn encode_mtime(time: SystemTime) -> String {
    system_time_to_nanos(time).to_string()
}

/// Decodes a stored modification time. Returns `None` for anything that is
/// not a decimal nanosecond count, such as a content hash written under the
/// other strategy.
pub fn decode_mtime(value: &str) -> Option<u128> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

use time::OffsetDateTime;

pub fn millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> i64 {
    millis(OffsetDateTime::now_utc())
}

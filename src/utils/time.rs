use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// End of a subscription period that starts at `start`.
pub fn add_days(start: DateTime<Utc>, days: i32) -> DateTime<Utc> {
    start + Duration::days(i64::from(days))
}

use chrono::{DateTime, Utc};

pub const NEVER: &str = "Never";

#[must_use]
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[must_use]
pub fn format_last_updated(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| NEVER.to_string(), format_datetime)
}

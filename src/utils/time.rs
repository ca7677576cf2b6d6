use chrono::{Local, NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;

/// The server's current calendar day, used for "book at least a day ahead".
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

/// `YYYY-MM-DD HH:MM` in server local time.
pub fn format_timestamp(ts: &DateTimeWithTimeZone) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

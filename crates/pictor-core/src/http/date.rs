use chrono::{DateTime, Utc};

/// RFC 7231 HTTP date, e.g. `Mon, 15 Jan 2024 10:30:00 GMT`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

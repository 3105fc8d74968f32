use chrono::{DateTime, Utc};

/// Discord timestamp markup, e.g. `<t:1700000000:R>` for a relative time.
pub fn discord_timestamp(at: DateTime<Utc>, style: char) -> String {
    format!("<t:{}:{}>", at.timestamp(), style)
}

/// Fixed-width UTC rendering for plain-text case listings.
pub fn format_utc(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn format_optional_utc(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "N/A".to_owned(), format_utc)
}

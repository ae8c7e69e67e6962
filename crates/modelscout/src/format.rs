//! Human-readable sizes and timestamps for result entries

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count using the largest unit that keeps the value below 1024.
///
/// Values are rounded to two decimals and trailing zeros are dropped, so 1024
/// renders as `1 KB` and 1536 as `1.5 KB`. Anything past GB stays in GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{} {}", trim_decimals(value), UNITS[unit])
}

fn trim_decimals(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Render a timestamp in the `he-IL` numeric style: `DD.MM.YYYY, HH:mm`.
///
/// Accepts naive ISO-8601 timestamps (as the scan service emits them), RFC 3339
/// timestamps with an offset (converted to local time) and bare dates, which
/// are read as UTC midnight and shown in local time.
/// Anything else renders as `Invalid Date`.
pub fn format_date(date_string: &str) -> String {
    match parse_timestamp(date_string.trim()) {
        Some(dt) => dt.format("%d.%m.%Y, %H:%M").to_string(),
        None => "Invalid Date".to_string(),
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    let midnight = s.parse::<NaiveDate>().ok()?.and_hms_opt(0, 0, 0)?;
    Some(
        Utc.from_utc_datetime(&midnight)
            .with_timezone(&Local)
            .naive_local(),
    )
}

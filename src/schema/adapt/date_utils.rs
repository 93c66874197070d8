//! Module for handling date parsing.

use chrono::NaiveDate;

use crate::schema::adapt::types::DateFormatConfig;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Parse a date string with multiple format attempts
#[must_use]
pub fn parse_date_string(s: &str, config: &DateFormatConfig) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in &config.date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    if config.enable_format_detection {
        if let Some(detected_format) = detect_date_format(s) {
            return NaiveDate::parse_from_str(s, detected_format).ok();
        }
    }

    None
}

/// Try to detect the date format based on string patterns
#[must_use]
pub fn detect_date_format(s: &str) -> Option<&'static str> {
    // Numeric dates written out of a spreadsheet sometimes carry a trailing ".0"
    if s.len() == 10 && s.ends_with(".0") && s[..8].bytes().all(|b| b.is_ascii_digit()) {
        return Some("%Y%m%d.0");
    }
    if s.len() == 10 && s.as_bytes().get(4) == Some(&b'-') && s.as_bytes().get(7) == Some(&b'-') {
        return Some("%Y-%m-%d");
    }
    None
}

/// Convert a date into Arrow's Date32 representation (days since the Unix epoch)
#[must_use]
pub fn date_to_days(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert Arrow's Date32 representation back into a date
#[must_use]
pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

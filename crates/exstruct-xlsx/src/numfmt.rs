//! Number-format classification and serial date rendering

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Whether a number format displays a date or time.
///
/// Built-in ids 14-22 and 45-47 are date/time formats. Custom codes are
/// scanned for date tokens after removing quoted literals, escaped
/// characters and bracketed sections such as colors or locales.
pub(crate) fn is_date_format(num_fmt_id: u32, custom: Option<&str>) -> bool {
    if let Some(code) = custom {
        return custom_code_is_date(code);
    }
    matches!(num_fmt_id, 14..=22 | 45..=47)
}

fn custom_code_is_date(code: &str) -> bool {
    // Only the first (positive) section decides.
    let section = code.split(';').next().unwrap_or("");
    if section.eq_ignore_ascii_case("general") {
        return false;
    }

    let mut stripped = String::with_capacity(section.len());
    let mut chars = section.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut inner = String::new();
                for b in chars.by_ref() {
                    if b == ']' {
                        break;
                    }
                    inner.push(b);
                }
                // Elapsed-time tokens like [h] or [mm] count as time.
                let lower = inner.to_ascii_lowercase();
                if !lower.is_empty() && lower.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    stripped.push('h');
                }
            }
            _ => stripped.push(c),
        }
    }

    stripped
        .chars()
        .any(|c| matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's'))
}

/// Render a serial date as ISO-8601 text.
///
/// Integral serials render as `YYYY-MM-DD`, serials below one as `HH:MM:SS`,
/// everything else as `YYYY-MM-DDTHH:MM:SS`. Returns `None` for serials that
/// fall outside the calendar.
pub(crate) fn serial_to_iso(serial: f64, date1904: bool) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;

    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if days < 60 {
        // Serials before the phantom 1900-02-29 are offset by one day.
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let midnight: NaiveDateTime = epoch.and_hms_opt(0, 0, 0)?;
    let stamp = midnight.checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))?;

    if days == 0 && !date1904 && seconds > 0 {
        return Some(stamp.format("%H:%M:%S").to_string());
    }
    if seconds == 0 {
        return Some(stamp.format("%Y-%m-%d").to_string());
    }
    Some(stamp.format("%Y-%m-%dT%H:%M:%S").to_string())
}

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Parse an ISO 8601 duration such as `PT1H2M3S` or `P1DT5M`.
///
/// Only the designators YouTube emits are understood (weeks, days, hours, minutes, seconds).
/// Years and months have no fixed length and make the value unparsable.
pub fn parse_iso8601_duration(value: &str) -> Option<chrono::Duration> {
    let rest = value.trim().strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }

    let mut seconds = 0f64;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            c if c.is_ascii_digit() || c == '.' || c == ',' => {
                number.push(if c == ',' { '.' } else { c })
            }
            designator => {
                let n: f64 = number.parse().ok()?;
                number.clear();
                let unit = match (designator, in_time) {
                    ('W', false) => 604_800.0,
                    ('D', false) => 86_400.0,
                    ('H', true) => 3_600.0,
                    ('M', true) => 60.0,
                    ('S', true) => 1.0,
                    _ => return None,
                };
                seconds += n * unit;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }

    chrono::Duration::try_milliseconds((seconds * 1000.0).round() as i64)
}

/// Parse a `YYYY-MM-DD` date into the UTC midnight that starts it
pub fn parse_published_after(date: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{}', expected YYYY-MM-DD", date))?;

    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{}'", date))?;

    Ok(Utc.from_utc_datetime(&midnight))
}

/// Shorten text for log lines without splitting a character
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut shortened: String = text.chars().take(max_chars).collect();
    shortened.push('…');
    shortened
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

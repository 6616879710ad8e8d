//! Duration parsing and formatting.
//!
//! Command-line flags accept the same short forms the scenario file uses
//! ("100ms", "2s", "5m", "1h"); bare numbers are seconds.

use std::time::Duration;

/// Parse a duration string into a [`Duration`]
///
/// Supported units, longest suffix first:
/// - Milliseconds: "100ms", "100msec", "100millis"
/// - Seconds: "2s", "2sec", "2secs", "2seconds", or a bare "2"
/// - Minutes: "5m", "5min", "5mins", "5minutes"
/// - Hours: "1h", "1hr", "1hrs", "1hours"
///
/// Fractional values are allowed for seconds, e.g. "0.5s" or "144.6".
///
/// # Examples
/// ```
/// use dashsim::utils::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("100ms"), Ok(Duration::from_millis(100)));
/// assert_eq!(parse_duration("2"), Ok(Duration::from_secs(2)));
/// assert!(parse_duration("fast").is_err());
/// ```
pub fn parse_duration(duration: &str) -> Result<Duration, String> {
    let duration = duration.trim();
    let (number, unit) = split_number(duration);
    if number.is_empty() {
        return Err(format!("Invalid duration format: {}", duration));
    }

    let invalid = || format!("Invalid duration format: {}", duration);
    let unit_nanos: u64 = match unit {
        "ms" | "msec" | "msecs" | "millis" => 1_000_000,
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1_000_000_000,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000_000_000,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000_000_000,
        _ => return Err(invalid()),
    };

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(unit_nanos)
            .map(Duration::from_nanos)
            .ok_or_else(invalid);
    }
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let nanos = (value * unit_nanos as f64).round();
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Format a duration the way the scenario document writes times:
/// whole seconds as "2s", anything finer in milliseconds
pub fn format_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else if duration.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}us", duration.as_micros())
    }
}

/// Split into the leading numeric part and the unit suffix
fn split_number(duration: &str) -> (&str, &str) {
    let end = duration
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(duration.len());
    (&duration[..end], duration[end..].trim())
}

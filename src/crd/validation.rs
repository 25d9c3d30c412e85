//! Format checks for experiment parameters
//!
//! Durations (`30s`, `5m`, `1h`), network timings (`ms`/`s`), percentages in
//! `0..=100` and bandwidth rates (`bps`, `kbps`, `mbps`, `gbps`).

use std::time::Duration;

use crate::Error;

/// Split `<digits><suffix>` into the numeric part and the suffix.
///
/// Returns `None` if the input does not start with at least one ASCII digit.
fn split_number(input: &str) -> Option<(u64, &str)> {
    let digits = input.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value = input[..digits].parse().ok()?;
    Some((value, &input[digits..]))
}

/// Parse an experiment duration (`\d+[smh]`) into a `Duration`.
///
/// ```
/// use std::time::Duration;
/// use chaos_harness::crd::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
/// assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
/// ```
pub fn parse_duration(duration: &str) -> Result<Duration, Error> {
    let invalid = || {
        Error::validation(
            "duration",
            format!("invalid duration '{duration}', use a format like '30s', '5m' or '2h'"),
        )
    };

    let (value, unit) = split_number(duration).ok_or_else(invalid)?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return Err(invalid()),
    };
    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

/// Validate a network timing parameter such as latency or jitter (`\d+(ms|s|m)`).
pub fn validate_network_duration(field: &str, value: &str) -> Result<(), Error> {
    match split_number(value) {
        Some((_, "ms" | "s" | "m")) => Ok(()),
        _ => Err(Error::validation(
            field,
            format!("invalid format '{value}', expected <number><unit> with unit ms/s/m (e.g. '100ms', '1s')"),
        )),
    }
}

/// Validate a percentage string: a number between 0 and 100 inclusive.
pub fn validate_percentage(field: &str, value: &str) -> Result<f64, Error> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        Error::validation(
            field,
            format!("invalid value '{value}', expected a number between 0 and 100"),
        )
    })?;
    if !(0.0..=100.0).contains(&parsed) {
        return Err(Error::validation(
            field,
            format!("invalid value '{value}', must be between 0 and 100"),
        ));
    }
    Ok(parsed)
}

/// Validate a bandwidth rate such as `1mbps` or `100kbps`.
pub fn validate_rate(field: &str, value: &str) -> Result<(), Error> {
    let unit = split_number(value).map(|(_, unit)| unit.to_ascii_lowercase());
    match unit.as_deref() {
        Some("bps" | "kbps" | "mbps" | "gbps" | "tbps") => Ok(()),
        _ => Err(Error::validation(
            field,
            format!("invalid rate '{value}', expected <number><unit> with unit bps/kbps/mbps/gbps/tbps"),
        )),
    }
}

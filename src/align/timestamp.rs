use anyhow::{Result, bail};

/// Parse a classifier clock string into seconds.
///
/// Two-part values are "MM:SS", three-part values are "HH:MM:SS". Minutes in
/// the two-part form may exceed 59 ("75:30" is 75 minutes in).
pub fn parse_clock(value: &str) -> Result<f64> {
    let parts: Vec<&str> = value.trim().split(':').collect();

    let numbers: Result<Vec<u64>, _> = parts.iter().map(|p| p.trim().parse::<u64>()).collect();
    let numbers = match numbers {
        Ok(n) if !value.trim().is_empty() => n,
        _ => bail!("unparsable clock value {value:?}"),
    };

    match numbers.as_slice() {
        [minutes, seconds] if *seconds < 60 => Ok((minutes * 60 + seconds) as f64),
        [hours, minutes, seconds] if *minutes < 60 && *seconds < 60 => {
            Ok((hours * 3600 + minutes * 60 + seconds) as f64)
        }
        _ => bail!("unparsable clock value {value:?}"),
    }
}

/// Format seconds as "MM:SS" with unbounded minutes, matching the form the
/// classifier emits.
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

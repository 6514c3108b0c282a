//! CLI to Config conversion utilities

use crate::config::cli;
use crate::workload::Integrand;
use anyhow::{Context, Result};

/// Parse a duration string (e.g., "500ms", "2s", "1m") to milliseconds
///
/// A bare number is taken as milliseconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (num_str, multiplier) = if s.ends_with("ms") {
        (s.trim_end_matches("ms"), 1u64)
    } else if s.ends_with("sec") || s.ends_with('s') {
        (s.trim_end_matches("sec").trim_end_matches('s'), 1000)
    } else if s.ends_with("min") || s.ends_with('m') {
        (s.trim_end_matches("min").trim_end_matches('m'), 60_000)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str.trim().parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {}", s))
}

/// Convert CLI IntegrandArg to workload Integrand
pub fn convert_integrand(arg: cli::IntegrandArg) -> Integrand {
    match arg {
        cli::IntegrandArg::Square => Integrand::Square,
        cli::IntegrandArg::Cube => Integrand::Cube,
        cli::IntegrandArg::Sine => Integrand::Sine,
        cli::IntegrandArg::Identity => Integrand::Identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_ms() {
        assert_eq!(parse_duration_ms("500ms").unwrap(), 500);
        assert_eq!(parse_duration_ms("2s").unwrap(), 2000);
        assert_eq!(parse_duration_ms("3sec").unwrap(), 3000);
        assert_eq!(parse_duration_ms("1m").unwrap(), 60_000);
        assert_eq!(parse_duration_ms("250").unwrap(), 250);
        assert_eq!(parse_duration_ms(" 1S ").unwrap(), 1000);
    }

    #[test]
    fn test_parse_duration_ms_rejects_garbage() {
        assert!(parse_duration_ms("").is_err());
        assert!(parse_duration_ms("fast").is_err());
        assert!(parse_duration_ms("-1s").is_err());
    }

    #[test]
    fn test_parse_duration_ms_rejects_overflow() {
        assert!(parse_duration_ms("400000000000000m").is_err());
        assert!(parse_duration_ms("18446744073709551615s").is_err());
        assert_eq!(parse_duration_ms("18446744073709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn test_convert_integrand() {
        assert_eq!(convert_integrand(cli::IntegrandArg::Square), Integrand::Square);
        assert_eq!(convert_integrand(cli::IntegrandArg::Sine), Integrand::Sine);
    }
}

//! FILENAME: model/src/number_format.rs
//! PURPOSE: Display formatting for defect rates.
//! CONTEXT: Rates stay full-precision floats through aggregation and
//! projection. Rounding to two decimals happens only here, at the point a
//! value becomes text on screen or in an export.

/// Formats a defect rate as `"3.33%"`.
/// Zero (and anything that is not a positive finite number) renders as an
/// empty string so empty buckets do not show up as `0.00%` noise.
pub fn format_rate(rate: f64) -> String {
    if rate.is_finite() && rate > 0.0 {
        format!("{:.2}%", rate)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(5.0 / 150.0 * 100.0), "3.33%");
        assert_eq!(format_rate(12.5), "12.50%");
        assert_eq!(format_rate(0.0), "");
        assert_eq!(format_rate(f64::NAN), "");
    }
}

//! Small numeric helpers shared by the scorers.

/// `numerator / denominator`, or 0 when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Round to a fixed number of decimal places so output is stable across platforms.
///
/// Values that round to zero come back as `0.0`, never `-0.0`.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(3.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 4.0), 0.75);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
        assert_eq!(round_to(79.96, 1), 80.0);
    }

    #[test]
    fn test_round_to_drops_negative_zero() {
        assert!(round_to(-0.04, 1).is_sign_positive());
        assert_eq!(round_to(-0.06, 1), -0.1);
    }
}

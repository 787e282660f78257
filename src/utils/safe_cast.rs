//! Checked and saturating numeric conversions

use crate::{constants::MAX_SCORE, Error, Result};
use std::time::Duration;

/// Safely convert u32 to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn u32_to_i32(value: u32) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Round a canonical score to a whole percentage in [0, 100]
///
/// Non-finite scores map to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
#[allow(clippy::cast_sign_loss)] // Clamped to non-negative first
pub fn score_to_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, MAX_SCORE) as u8
}

/// Whole milliseconds in a duration, saturating at u64::MAX
#[must_use]
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_u32_to_i32() {
        assert_eq!(u32_to_i32(42).unwrap(), 42);
        assert_eq!(u32_to_i32(0).unwrap(), 0);
        assert_eq!(u32_to_i32(i32::MAX as u32).unwrap(), i32::MAX);
        assert!(u32_to_i32(i32::MAX as u32 + 1).is_err());
        assert!(u32_to_i32(u32::MAX).is_err());
    }

    #[test]
    fn test_score_to_percent() {
        assert_eq!(score_to_percent(50.0), 50);
        assert_eq!(score_to_percent(29.5), 30);
        assert_eq!(score_to_percent(29.4), 29);
        assert_eq!(score_to_percent(-3.0), 0);
        assert_eq!(score_to_percent(180.0), 100);
        assert_eq!(score_to_percent(f64::NAN), 0);
        assert_eq!(score_to_percent(f64::INFINITY), 0);
    }

    #[test]
    fn test_duration_to_millis() {
        assert_eq!(duration_to_millis(Duration::from_micros(2500)), 2);
        assert_eq!(duration_to_millis(Duration::from_secs(3)), 3000);
        assert_eq!(duration_to_millis(Duration::MAX), u64::MAX);
    }

    proptest! {
        #[test]
        fn prop_u32_to_i32_within_bounds(value in 0..=i32::MAX as u32) {
            let result = u32_to_i32(value);
            prop_assert!(result.is_ok());
            prop_assert_eq!(result.unwrap() as u32, value);
        }

        #[test]
        fn prop_score_to_percent_always_within_bounds(value in any::<f64>()) {
            prop_assert!(score_to_percent(value) <= 100);
        }

        #[test]
        fn prop_score_to_percent_is_monotonic(a in 0.0f64..100.0, b in 0.0f64..100.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(score_to_percent(low) <= score_to_percent(high));
        }
    }
}

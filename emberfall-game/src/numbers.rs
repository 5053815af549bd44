//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Relative nudge applied before flooring so values such as `100 × 1.15`
/// land on 115 rather than 114.999….
const FLOOR_NUDGE: f64 = 1e-12;

/// Floor a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn floor_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let nudged = value + value.abs() * FLOOR_NUDGE;
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = nudged.clamp(min, max).floor();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Floor a f64 and clamp it to the i32 range, returning 0 for non-finite values.
#[must_use]
pub fn floor_f64_to_i32(value: f64) -> i32 {
    let wide = floor_f64_to_i64(value);
    i32::try_from(wide).unwrap_or(if wide < 0 { i32::MIN } else { i32::MAX })
}

/// Clamp an i64 into the u32 range.
#[must_use]
pub fn clamp_i64_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Clamp an i64 into the i32 range.
#[must_use]
pub fn clamp_i64_to_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Integer percentage of a value, floored: `⌊value × pct / 100⌋`.
#[must_use]
pub fn percent_of(value: i32, pct: u32) -> i32 {
    let product = i64::from(value) * i64::from(pct);
    clamp_i64_to_i32(product.div_euclid(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_absorbs_representation_error() {
        assert_eq!(floor_f64_to_i64(100.0 * 1.15), 115);
        assert_eq!(floor_f64_to_i64(114.7), 114);
        assert_eq!(floor_f64_to_i64(-0.5), -1);
    }

    #[test]
    fn floor_handles_non_finite() {
        assert_eq!(floor_f64_to_i64(f64::NAN), 0);
        assert_eq!(floor_f64_to_i64(f64::INFINITY), 0);
        assert_eq!(floor_f64_to_i32(f64::from(i32::MAX) * 4.0), i32::MAX);
    }

    #[test]
    fn clamps_cover_ranges() {
        assert_eq!(clamp_i64_to_u32(-4), 0);
        assert_eq!(clamp_i64_to_u32(i64::MAX), u32::MAX);
        assert_eq!(clamp_i64_to_i32(i64::MIN), i32::MIN);
        assert_eq!(percent_of(155, 30), 46);
    }
}

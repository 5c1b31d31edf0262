//! Significant-digit rounding.

/// Round `value` to `digits` significant digits, half away from zero.
///
/// The number of decimal places is derived from the decimal exponent, so
/// `1234.5` and `0.00012345` are rounded to the same relative precision.
/// `digits` below 1 is treated as 1. Zero and non-finite values are returned
/// unchanged, as is any value whose scaled form would overflow.
///
/// ```
/// use curvegate_domain::round_to_significant_digits;
///
/// assert_eq!(round_to_significant_digits(1.00001, 4), 1.0);
/// assert_eq!(round_to_significant_digits(-2.5, 1), -3.0);
/// assert_eq!(round_to_significant_digits(123456.0, 2), 120000.0);
/// ```
pub fn round_to_significant_digits(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let digits = i32::try_from(digits.max(1)).unwrap_or(i32::MAX);
    let decimals = digits.saturating_sub(1).saturating_sub(decimal_exponent(value));

    let rounded = if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        let scaled = value * scale;
        if !scaled.is_finite() || !scale.is_finite() {
            return value;
        }
        scaled.round() / scale
    } else {
        let scale = 10f64.powi(-decimals);
        (value / scale).round() * scale
    };

    if rounded.is_finite() { rounded } else { value }
}

/// `floor(log10(|value|))`, corrected for `log10` landing just off an exact
/// power of ten.
pub(crate) fn decimal_exponent(value: f64) -> i32 {
    let abs = value.abs();
    let mut exp = abs.log10().floor() as i32;
    if 10f64.powi(exp) > abs {
        exp -= 1;
    } else if 10f64.powi(exp + 1) <= abs {
        exp += 1;
    }
    exp
}

use std::iter::repeat_n;

use crate::{CanonicalizationError, MAX_SAFE_INTEGER};

/// Renders an integer. Beyond the safe range the value is treated as the
/// nearest double, as ECMAScript does when it reads the number.
pub(crate) fn format_signed(value: i128) -> Result<String, CanonicalizationError> {
    if value.unsigned_abs() <= u128::from(MAX_SAFE_INTEGER) {
        return Ok(value.to_string());
    }
    format_f64(value as f64)
}

pub(crate) fn format_unsigned(value: u128) -> Result<String, CanonicalizationError> {
    if value <= u128::from(MAX_SAFE_INTEGER) {
        return Ok(value.to_string());
    }
    format_f64(value as f64)
}

/// Renders a double the way ECMAScript `Number::toString` does.
pub(crate) fn format_f64(value: f64) -> Result<String, CanonicalizationError> {
    if !value.is_finite() {
        return Err(CanonicalizationError::NonFiniteNumber);
    }
    if value == 0.0 {
        return Ok("0".to_owned());
    }

    let mut buffer = ryu::Buffer::new();
    let rendered = buffer.format_finite(value.abs());
    let (digits, point) = decimal_parts(rendered)?;

    let mut out = String::with_capacity(digits.len() + 8);
    if value.is_sign_negative() {
        out.push('-');
    }
    render(&mut out, &digits, point);
    Ok(out)
}

/// Splits a shortest-digits rendering into its significant digits and `n`,
/// the decimal exponent such that the value is `0.digits × 10^n`.
fn decimal_parts(rendered: &str) -> Result<(String, i32), CanonicalizationError> {
    let (mantissa, exponent) = match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent = exponent.parse::<i32>().map_err(|_| {
                CanonicalizationError::Custom(format!("unexpected float rendering {rendered}"))
            })?;
            (mantissa, exponent)
        }
        None => (rendered, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let all: String = whole.chars().chain(fraction.chars()).collect();
    let significant = all.trim_start_matches('0');
    let leading_zeros = (all.len() - significant.len()) as i32;
    let digits = significant.trim_end_matches('0').to_owned();

    Ok((digits, whole.len() as i32 + exponent - leading_zeros))
}

fn render(out: &mut String, digits: &str, n: i32) {
    let k = digits.len() as i32;

    if k <= n && n <= 21 {
        out.push_str(digits);
        out.extend(repeat_n('0', (n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (whole, fraction) = digits.split_at(n as usize);
        out.push_str(whole);
        out.push('.');
        out.push_str(fraction);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(repeat_n('0', n.unsigned_abs() as usize));
        out.push_str(digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let exponent = n - 1;
        out.push('e');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(&exponent.unsigned_abs().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn f(value: f64) -> String {
        format_f64(value).unwrap()
    }

    #[test]
    fn it_renders_integral_doubles_without_a_fraction() {
        assert_eq!(f(1.0), "1");
        assert_eq!(f(100.0), "100");
        assert_eq!(f(-42.0), "-42");
        assert_eq!(f(1e20), "100000000000000000000");
    }

    #[test]
    fn it_switches_to_exponent_form_at_1e21() {
        assert_eq!(f(1e21), "1e+21");
        assert_eq!(f(1.5e21), "1.5e+21");
        assert_eq!(f(1e30), "1e+30");
    }

    #[test]
    fn it_keeps_small_values_decimal_down_to_1e_minus_6() {
        assert_eq!(f(0.000001), "0.000001");
        assert_eq!(f(0.0000015), "0.0000015");
        assert_eq!(f(0.1), "0.1");
        assert_eq!(f(0.002), "0.002");
        assert_eq!(f(1e-7), "1e-7");
        assert_eq!(f(1.25e-7), "1.25e-7");
    }

    #[test]
    fn it_uses_shortest_round_trip_digits() {
        assert_eq!(f(4.5), "4.5");
        assert_eq!(f(123.456), "123.456");
        assert_eq!(f(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(f(333333333.33333329), "333333333.3333333");
    }

    #[test]
    fn it_renders_the_extremes() {
        assert_eq!(f(f64::MAX), "1.7976931348623157e+308");
        assert_eq!(f(f64::MIN_POSITIVE), "2.2250738585072014e-308");
        assert_eq!(f(5e-324), "5e-324");
    }

    #[test]
    fn it_normalizes_negative_zero() {
        assert_eq!(f(-0.0), "0");
        assert_eq!(f(0.0), "0");
    }

    #[test]
    fn it_rejects_non_finite_values() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(
                format_f64(value),
                Err(CanonicalizationError::NonFiniteNumber)
            );
        }
    }

    #[test]
    fn it_renders_safe_integers_verbatim() {
        assert_eq!(format_signed(9_007_199_254_740_991).unwrap(), "9007199254740991");
        assert_eq!(format_signed(-9_007_199_254_740_991).unwrap(), "-9007199254740991");
        assert_eq!(format_unsigned(0).unwrap(), "0");
    }

    #[test]
    fn it_renders_large_integers_as_the_nearest_double() {
        assert_eq!(format_signed(9_007_199_254_740_992).unwrap(), "9007199254740992");
        assert_eq!(format_signed(9_007_199_254_740_993).unwrap(), "9007199254740992");
        assert_eq!(format_unsigned(10_000_000_000_000_000).unwrap(), "10000000000000000");
        assert_eq!(format_unsigned(1 << 60).unwrap(), "1152921504606847000");
        assert_eq!(format_unsigned(u128::from(u64::MAX)).unwrap(), "18446744073709552000");
        assert_eq!(format_signed(-(1 << 70)).unwrap(), "-1.1805916207174113e+21");
    }

    #[test]
    fn large_integer_renderings_are_fixed_points() {
        for value in [1u64 << 60, 1_152_921_504_606_847_000, u64::MAX, 9_007_199_254_740_993] {
            let rendered = format_unsigned(u128::from(value)).unwrap();
            let reparsed: u128 = rendered.parse().unwrap();
            assert_eq!(format_unsigned(reparsed).unwrap(), rendered);
        }
    }
}

//! Scalar numeric coercion from token spans.
//!
//! Both parsers assume the span already matched the number grammar during
//! the scan; an unrecognized shape just yields `None` and the caller turns
//! that into a conversion error.

use lazy_static::lazy_static;

lazy_static! {
    /// 10^e for e in -308..=308, indexed by e + 308.
    static ref POW10: [f64; 617] = {
        let mut table = [0.0f64; 617];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = 10f64.powi(i as i32 - 308);
        }
        table
    };
}

#[inline]
fn pow10(e: i32) -> f64 {
    POW10[(e + 308) as usize]
}

/// Decimal digits with an optional leading `-`, accumulated as an unsigned
/// 64-bit magnitude with checked arithmetic; overflow yields `None`.
///
/// Callers range-check the (sign, magnitude) pair against their target, so
/// the full `u64` range stays reachable for unsigned targets.
pub(crate) fn parse_magnitude(bytes: &[u8]) -> Option<(bool, u64)> {
    let (negative, digits) = match bytes.split_first()? {
        (b'-', rest) => (true, rest),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return None;
    }
    let mut acc: u64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        acc = acc
            .checked_mul(10)?
            .checked_add(u64::from(b - b'0'))?;
    }
    Some((negative, acc))
}

/// Signed view of the token; `i64::MIN` is reachable, anything outside the
/// signed range is not a number.
pub(crate) fn parse_integer(bytes: &[u8]) -> Option<i64> {
    let (negative, magnitude) = parse_magnitude(bytes)?;
    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

/// Unsigned view of the token; covers the full `u64` range. `-0` is zero,
/// any other negative is not a number.
pub(crate) fn parse_unsigned(bytes: &[u8]) -> Option<u64> {
    match parse_magnitude(bytes)? {
        (false, magnitude) | (true, magnitude @ 0) => Some(magnitude),
        (true, _) => None,
    }
}

/// A single scan identifies significand, fraction length and base-10
/// exponent; the value is then one multiply (or divide) against the
/// exponent table. The fast path is only taken where that one rounding step
/// is exact: at most 15 significant digits and |exponent| <= 22. Everything
/// else goes through the host string parser.
pub(crate) fn parse_float(bytes: &[u8]) -> Option<f64> {
    let mut i = 0;
    let negative = bytes.first() == Some(&b'-');
    if negative {
        i = 1;
    }

    let mut sig: u64 = 0;
    let mut digits = 0usize;
    let mut overflowed = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        accumulate(&mut sig, &mut digits, &mut overflowed, bytes[i]);
        i += 1;
    }
    if i == (negative as usize) {
        return None;
    }

    let mut exp: i32 = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            if !overflowed {
                accumulate(&mut sig, &mut digits, &mut overflowed, bytes[i]);
                exp -= 1;
            }
            i += 1;
        }
        if i == frac_start {
            return None;
        }
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        let exp_negative = match bytes.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };
        let exp_start = i;
        let mut explicit: i32 = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            explicit = explicit
                .saturating_mul(10)
                .saturating_add(i32::from(bytes[i] - b'0'));
            i += 1;
        }
        if i == exp_start {
            return None;
        }
        exp += if exp_negative { -explicit } else { explicit };
    }

    if i != bytes.len() {
        return None;
    }

    if overflowed || digits > 15 || !(-22..=22).contains(&exp) {
        return slow_parse(bytes);
    }

    let mut value = sig as f64;
    value = if exp >= 0 {
        value * pow10(exp)
    } else {
        value / pow10(-exp)
    };
    Some(if negative { -value } else { value })
}

#[inline]
fn accumulate(sig: &mut u64, digits: &mut usize, overflowed: &mut bool, byte: u8) {
    match sig
        .checked_mul(10)
        .and_then(|s| s.checked_add(u64::from(byte - b'0')))
    {
        Some(s) => {
            *sig = s;
            if *sig != 0 {
                *digits += 1;
            }
        }
        None => *overflowed = true,
    }
}

fn slow_parse(bytes: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(bytes).ok()?;
    s.parse::<f64>().ok()
}

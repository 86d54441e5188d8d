//! Fixed-point arithmetic and decimal text conversion.
//!
//! Physical quantities are `u16` magnitudes in fixed minor units
//! (millivolts, milliamps). Calibration coefficients are signed Q22.10
//! (`i32` with [`FIXED_SHIFT`] fractional bits), wide enough to express an
//! mV-per-count slope with sub-millivolt resolution.

use core::fmt::Write as _;

/// Magnitude in milli units (millivolts or milliamps).
pub type Milli = u16;

/// Calibration coefficient, Q22.10.
pub type Fixed = i32;

/// Fractional bits in a [`Fixed`] value.
pub const FIXED_SHIFT: u32 = 10;

/// The [`Fixed`] representation of 1.0.
pub const FIXED_ONE: Fixed = 1 << FIXED_SHIFT;

/// Affine conversion of a raw count to a milli-unit magnitude:
/// `round((raw * a - b) / 2^10)`, saturated to the `u16` range.
///
/// Monotonic in `raw` for `a > 0`; saturates rather than wraps at both
/// boundaries.
pub const fn affine(raw: u16, a: Fixed, b: Fixed) -> Milli {
    let q10 = raw as i64 * a as i64 - b as i64;
    let value = (q10 + (FIXED_ONE as i64 / 2)) >> FIXED_SHIFT;
    if value < 0 {
        0
    } else if value > Milli::MAX as i64 {
        Milli::MAX
    } else {
        value as Milli
    }
}

/// Inverse of [`affine`]: the raw count (or PWM duty) whose conversion lands
/// nearest a target milli-unit magnitude. Saturates to the `u16` range; a
/// zero slope yields 0 rather than dividing by it.
pub const fn affine_inverse(value: Milli, a: Fixed, b: Fixed) -> u16 {
    if a == 0 {
        return 0;
    }
    let q10 = ((value as i64) << FIXED_SHIFT) + b as i64;
    let raw = (q10 + a as i64 / 2) / a as i64;
    if raw < 0 {
        0
    } else if raw > u16::MAX as i64 {
        u16::MAX
    } else {
        raw as u16
    }
}

/// Parse operator-supplied decimal text into a milli-unit magnitude.
///
/// `"5000"` is a millivalue directly; `"5.0"` / `"5.00"` / `"5.000"` are
/// unit values with up to three fractional digits. A leading `+` is
/// accepted. Returns `None` for malformed text: empty, a bare `.`, a
/// negative sign, any non-digit, more than three fractional digits, or
/// overflow.
///
/// The result is `u32` so an in-format but out-of-cap value (e.g. `99999`)
/// still parses and can be rejected by the caller's range check with its
/// own message.
pub fn parse_milli(text: &str) -> Option<u32> {
    let text = text.strip_prefix('+').unwrap_or(text);
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (text, None),
    };
    if whole.is_empty() {
        return None;
    }
    let mut value: u32 = 0;
    for byte in whole.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value
            .checked_mul(10)?
            .checked_add((byte - b'0') as u32)?;
    }
    let Some(frac) = frac else {
        return Some(value);
    };
    if frac.is_empty() || frac.len() > 3 {
        return None;
    }
    let mut milli = value.checked_mul(1000)?;
    let mut place: u32 = 100;
    for byte in frac.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        milli = milli.checked_add((byte - b'0') as u32 * place)?;
        place /= 10;
    }
    Some(milli)
}

/// Parse a raw calibration coefficient: a plain decimal integer with an
/// optional sign, stored as-is in the Q22.10 domain. Returns `None` for
/// malformed text or values outside the `i32` range.
pub fn parse_fixed(text: &str) -> Option<Fixed> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (byte - b'0') as i64;
        if value > i32::MAX as i64 + 1 {
            return None;
        }
    }
    let value = if negative { -value } else { value };
    Fixed::try_from(value).ok()
}

/// Format a milli-unit magnitude as `"D.DDD"` decimal text.
pub fn format_milli(value: Milli) -> heapless::String<8> {
    let mut text = heapless::String::new();
    let _ = write!(text, "{}.{:03}", value / 1000, value % 1000);
    text
}

/// Format a Q22.10 coefficient as signed `"D.DDD"` decimal text, truncated
/// to three fractional digits.
pub fn format_fixed(value: Fixed) -> heapless::String<12> {
    let mut text = heapless::String::new();
    let milli = (value.unsigned_abs() as u64 * 1000) >> FIXED_SHIFT;
    let sign = if value < 0 { "-" } else { "" };
    let _ = write!(text, "{}{}.{:03}", sign, milli / 1000, milli % 1000);
    text
}

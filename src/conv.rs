//! Lenient conversions from optional text to typed values.
//!
//! Every function takes the raw text (usually a header, query or form value)
//! and a default. The default is returned when the text is absent or when no
//! number can be read from its leading token. Trailing garbage after a valid
//! leading number is ignored, so `"42abc"` reads as `42`.

/// Interprets a flag-like value.
///
/// With a `true` default only an explicit negative (`0`, `f`, `F` as the first
/// character) turns the result off. With a `false` default only an explicit
/// positive (`1`, `t`, `T`) turns it on.
///
/// # Example
///
/// ```
/// # use trickle::conv::to_bool;
/// assert!(to_bool(Some("true"), false));
/// assert!(!to_bool(Some("false"), true));
/// assert!(to_bool(None, true));
/// ```
pub fn to_bool(value: Option<&str>, default_value: bool) -> bool {
    let Some(first) = value.and_then(|v| v.chars().next()) else {
        return default_value;
    };

    if default_value {
        !matches!(first, '0' | 'f' | 'F')
    } else {
        matches!(first, '1' | 't' | 'T')
    }
}

/// Reads a signed integer from the leading token of `value`.
pub fn to_i64(value: Option<&str>, default_value: i64) -> i64 {
    value
        .map(str::trim_start)
        .and_then(|v| {
            let sign_len = usize::from(v.starts_with(['+', '-']));
            let digits = leading_digits(&v[sign_len..]);
            if digits.is_empty() {
                return None;
            }
            v[..sign_len + digits.len()].parse().ok()
        })
        .unwrap_or(default_value)
}

/// Reads an unsigned integer from the leading token of `value`.
///
/// A leading `-` is rejected rather than wrapped.
///
/// # Example
///
/// ```
/// # use trickle::conv::to_u64;
/// assert_eq!(to_u64(Some(" 512"), 0), 512);
/// assert_eq!(to_u64(Some("-1"), 7), 7);
/// ```
pub fn to_u64(value: Option<&str>, default_value: u64) -> u64 {
    value
        .map(str::trim_start)
        .and_then(|v| {
            let v = v.strip_prefix('+').unwrap_or(v);
            let digits = leading_digits(v);
            if digits.is_empty() {
                return None;
            }
            digits.parse().ok()
        })
        .unwrap_or(default_value)
}

/// Reads a floating point number from the leading token of `value`.
pub fn to_f64(value: Option<&str>, default_value: f64) -> f64 {
    let Some(v) = value.map(str::trim_start) else {
        return default_value;
    };

    let candidate_len = v
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(v.len());

    // Longest prefix that still parses, e.g. "1.5e" -> "1.5".
    (1..=candidate_len)
        .rev()
        .find_map(|end| v[..end].parse().ok())
        .unwrap_or(default_value)
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    &s[..end]
}

//! String to scalar parsing behind the typed property accessors.
//!
//! The set of supported types is closed: every target implements
//! [`FromProperty`] explicitly. Non-strict parsing accepts a valid leading
//! prefix (`"12abc"` parses as `12`), strict parsing requires the whole
//! trimmed value to be valid.

const BOOLEAN_TRUE: [&str; 4] = ["true", "yes", "on", "1"];
const BOOLEAN_FALSE: [&str; 4] = ["false", "no", "off", "0"];

/// A type that can be parsed from a property value.
pub trait FromProperty: Sized {
    /// Human readable name used in error messages.
    const EXPECTED: &'static str;

    fn from_property(value: &str, strict: bool) -> Option<Self>;
}

impl FromProperty for String {
    const EXPECTED: &'static str = "a string";

    fn from_property(value: &str, _strict: bool) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromProperty for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_property(value: &str, strict: bool) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        let matches = |word: &str| {
            if strict {
                v == word
            } else {
                v.starts_with(word)
            }
        };
        if BOOLEAN_TRUE.iter().any(|w| matches(w)) {
            Some(true)
        } else if BOOLEAN_FALSE.iter().any(|w| matches(w)) {
            Some(false)
        } else {
            None
        }
    }
}

macro_rules! integer_from_property {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromProperty for $ty {
                const EXPECTED: &'static str = $name;

                fn from_property(value: &str, strict: bool) -> Option<Self> {
                    parse_integer(value, strict).and_then(|n| <$ty>::try_from(n).ok())
                }
            }
        )*
    };
}

integer_from_property! {
    i32 => "an int",
    i64 => "a long",
    i128 => "a big integer",
}

impl FromProperty for f64 {
    const EXPECTED: &'static str = "a double";

    fn from_property(value: &str, strict: bool) -> Option<Self> {
        let trimmed = value.trim();
        let number = float_prefix(trimmed);
        if number.is_empty() || (strict && number.len() != trimmed.len()) {
            return None;
        }
        number.parse().ok()
    }
}

impl FromProperty for f32 {
    const EXPECTED: &'static str = "a float";

    fn from_property(value: &str, strict: bool) -> Option<Self> {
        f64::from_property(value, strict).map(|f| f as f32)
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer.
fn parse_integer(value: &str, strict: bool) -> Option<i128> {
    let trimmed = value.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let hex = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"));
    let (digits, radix, consumed) = match hex {
        Some(rest) => {
            let digits = leading(rest, |b| b.is_ascii_hexdigit());
            (digits, 16, digits.len() + 2)
        }
        None => {
            let digits = leading(unsigned, |b| b.is_ascii_digit());
            (digits, 10, digits.len())
        }
    };

    if digits.is_empty() || (strict && consumed != unsigned.len()) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn leading(s: &str, accept: impl Fn(u8) -> bool) -> &str {
    let end = s.bytes().position(|b| !accept(b)).unwrap_or(s.len());
    &s[..end]
}

/// Returns the longest prefix of `s` shaped like a floating point literal.
fn float_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if has_digits || frac_end > frac_start {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return "";
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_strict_and_lenient() {
        assert_eq!(i32::from_property("42", true), Some(42));
        assert_eq!(i32::from_property(" -7 ", true), Some(-7));
        assert_eq!(i32::from_property("12abc", false), Some(12));
        assert_eq!(i32::from_property("12abc", true), None);
        assert_eq!(i32::from_property("abc", false), None);
    }

    #[test]
    fn test_integer_hex_and_overflow() {
        assert_eq!(i64::from_property("0x1F", true), Some(31));
        assert_eq!(i32::from_property("0XfF", true), Some(255));
        assert_eq!(i32::from_property("3000000000", true), None);
        assert_eq!(i64::from_property("3000000000", true), Some(3_000_000_000));
        assert_eq!(
            i128::from_property("170141183460469231731687303715884105727", true),
            Some(i128::MAX)
        );
    }

    #[test]
    fn test_double() {
        assert_eq!(f64::from_property("3.25", true), Some(3.25));
        assert_eq!(f64::from_property(".5", true), Some(0.5));
        assert_eq!(f64::from_property("1e3", true), Some(1000.0));
        assert_eq!(f64::from_property("2.5kg", false), Some(2.5));
        assert_eq!(f64::from_property("2.5kg", true), None);
        assert_eq!(f64::from_property(".", false), None);
    }

    #[test]
    fn test_boolean() {
        assert_eq!(bool::from_property("YES", true), Some(true));
        assert_eq!(bool::from_property("off", true), Some(false));
        assert_eq!(bool::from_property("true-ish", false), Some(true));
        assert_eq!(bool::from_property("true-ish", true), None);
        assert_eq!(bool::from_property("maybe", false), None);
    }
}

//! Fixed-decimal token amount handling.
//!
//! Token balances are carried as integer base units (`U256`) and only turned
//! into decimal strings at the display edge, so formatting and parsing must
//! round-trip exactly for any value representable at the token's precision.

use alloy_primitives::U256;
use thiserror::Error;

/// Largest decimal count 10^n still fits in 256 bits for.
const MAX_DECIMALS: u8 = 77;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("malformed amount: {0}")]
    Malformed(String),

    #[error("amount has more than {decimals} fractional digits")]
    ExcessPrecision { decimals: u8 },

    #[error("amount does not fit in 256 bits")]
    Overflow,
}

fn pow10(n: usize) -> U256 {
    U256::from(10u64).pow(U256::from(n))
}

/// Render an integer amount of base units as a decimal string at the given
/// precision, trailing zeros trimmed. `format_units(1_000_000, 6) == "1"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS) as usize;
    if decimals == 0 {
        return value.to_string();
    }
    let scale = pow10(decimals);
    let int = value / scale;
    let frac = value % scale;
    if frac.is_zero() {
        return int.to_string();
    }
    let mut frac_str = frac.to_string();
    while frac_str.len() < decimals {
        frac_str.insert(0, '0');
    }
    let trimmed = frac_str.trim_end_matches('0');
    format!("{int}.{trimmed}")
}

/// Parse a decimal string into integer base units at the given precision.
///
/// Rejects inputs with more fractional digits than the token carries instead
/// of rounding; callers that accept free-form user input should run it
/// through [`normalize_amount_input`] first.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, AmountError> {
    let decimals = decimals.min(MAX_DECIMALS) as usize;
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match input.split_once('.') {
        Some((i, f)) => (i, f),
        None => (input, ""),
    };
    if frac_part.contains('.')
        || (int_part.is_empty() && frac_part.is_empty())
        || !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AmountError::Malformed(input.to_string()));
    }
    if frac_part.len() > decimals {
        return Err(AmountError::ExcessPrecision {
            decimals: decimals as u8,
        });
    }

    let int_value = if int_part.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(int_part, 10).map_err(|_| AmountError::Overflow)?
    };
    let mut frac_digits = frac_part.to_string();
    while frac_digits.len() < decimals {
        frac_digits.push('0');
    }
    let frac_value = if frac_digits.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_digits, 10).map_err(|_| AmountError::Overflow)?
    };

    int_value
        .checked_mul(pow10(decimals))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or(AmountError::Overflow)
}

#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub minimum_fraction_digits: usize,
    pub maximum_fraction_digits: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            minimum_fraction_digits: 2,
            maximum_fraction_digits: 2,
        }
    }
}

/// Pretty-print a plain decimal string for display: thousands grouping on the
/// integer part, fraction rounded half-up and padded to the requested digit
/// bounds. `format_amount("1", FormatOptions::default()) == "1.00"`.
///
/// Inputs that are not plain decimal strings are returned unchanged.
pub fn format_amount(value: &str, options: FormatOptions) -> String {
    let trimmed = value.trim();
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if trimmed.is_empty()
        || frac_part.contains('.')
        || !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return value.to_string();
    }

    let mut int_digits: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    if int_digits.is_empty() {
        int_digits.push(0);
    }
    let mut frac_digits: Vec<u8> = frac_part.bytes().map(|b| b - b'0').collect();

    if frac_digits.len() > options.maximum_fraction_digits {
        let round_up = frac_digits[options.maximum_fraction_digits] >= 5;
        frac_digits.truncate(options.maximum_fraction_digits);
        if round_up {
            let mut carry = true;
            let mut i = frac_digits.len();
            while carry && i > 0 {
                i -= 1;
                if frac_digits[i] == 9 {
                    frac_digits[i] = 0;
                } else {
                    frac_digits[i] += 1;
                    carry = false;
                }
            }
            if carry {
                let mut j = int_digits.len();
                while carry && j > 0 {
                    j -= 1;
                    if int_digits[j] == 9 {
                        int_digits[j] = 0;
                    } else {
                        int_digits[j] += 1;
                        carry = false;
                    }
                }
                if carry {
                    int_digits.insert(0, 1);
                }
            }
        }
    }
    while frac_digits.len() < options.minimum_fraction_digits {
        frac_digits.push(0);
    }

    // strip redundant leading zeros, keeping a single one
    let first_nonzero = int_digits
        .iter()
        .position(|&d| d != 0)
        .unwrap_or(int_digits.len() - 1);
    let int_digits = &int_digits[first_nonzero..];

    let mut out = String::new();
    let len = int_digits.len();
    for (idx, d) in int_digits.iter().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push((b'0' + d) as char);
    }
    if !frac_digits.is_empty() {
        out.push('.');
        for d in frac_digits {
            out.push((b'0' + d) as char);
        }
    }
    out
}

/// Sanitize free-form user input into a plain decimal string the token can
/// represent: strips grouping separators and stray characters, drops leading
/// zeros, and truncates the fraction to the token's precision.
pub fn normalize_amount_input(value: &str, decimals: u8) -> String {
    let decimals = decimals as usize;
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let has_dot = cleaned.contains('.');
    let mut segments = cleaned.split('.');
    let raw_int = segments.next().unwrap_or("");
    let raw_frac = segments.next().unwrap_or("");

    let stripped = raw_int.trim_start_matches('0');
    let int_part = if raw_int.is_empty() {
        ""
    } else if stripped.is_empty() {
        "0"
    } else {
        stripped
    };
    let frac_part = &raw_frac[..raw_frac.len().min(decimals)];

    if has_dot {
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        format!("{int_part}.{frac_part}")
    } else {
        int_part.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_units() {
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_units(U256::ZERO, 6), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!(parse_units("1", 6).unwrap(), U256::from(1_000_000u64));
        assert_eq!(parse_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_units("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(parse_units(".5", 6).unwrap(), U256::from(500_000u64));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_units("", 6), Err(AmountError::Empty));
        assert!(matches!(
            parse_units("1.2.3", 6),
            Err(AmountError::Malformed(_))
        ));
        assert!(matches!(
            parse_units("abc", 6),
            Err(AmountError::Malformed(_))
        ));
        assert_eq!(
            parse_units("0.1234567", 6),
            Err(AmountError::ExcessPrecision { decimals: 6 })
        );
    }

    #[test]
    fn format_parse_round_trip() {
        for (raw, decimals) in [
            (0u128, 6u8),
            (1, 6),
            (999_999, 6),
            (1_000_000, 6),
            (123_456_789, 6),
            (1, 18),
            (1_000_000_000_000_000_000, 18),
            (987_654_321_000_000_000_000, 18),
            (42, 0),
        ] {
            let value = U256::from(raw);
            let text = format_units(value, decimals);
            assert_eq!(parse_units(&text, decimals).unwrap(), value, "{text}");
        }
    }

    #[test]
    fn pretty_formatting_groups_and_pads() {
        let opts = FormatOptions::default();
        assert_eq!(format_amount("1", opts), "1.00");
        assert_eq!(format_amount("1234567.8", opts), "1,234,567.80");
        assert_eq!(format_amount("0.005", opts), "0.01");
        assert_eq!(format_amount("0.999", opts), "1.00");
        assert_eq!(format_amount("not a number", opts), "not a number");
    }

    #[test]
    fn pretty_formatting_honors_bounds() {
        let opts = FormatOptions {
            minimum_fraction_digits: 0,
            maximum_fraction_digits: 0,
        };
        assert_eq!(format_amount("1234.9", opts), "1,235");
        assert_eq!(format_amount("1234", opts), "1,234");
    }

    #[test]
    fn normalizes_user_input() {
        assert_eq!(normalize_amount_input("1,234.5678", 2), "1234.56");
        assert_eq!(normalize_amount_input("007", 6), "7");
        assert_eq!(normalize_amount_input("0", 6), "0");
        assert_eq!(normalize_amount_input(".5", 6), "0.5");
        assert_eq!(normalize_amount_input("1.2.3", 6), "1.2");
        assert_eq!(normalize_amount_input("$12abc", 6), "12");
        assert_eq!(normalize_amount_input("", 6), "");
    }
}

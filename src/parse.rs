//! Fixed-format decimal parsing for measurement values.
//!
//! Accepts exactly `[-]D+[.D+]` and nothing else: no whitespace, no `+`,
//! no exponent.

use thiserror::Error;

/// Fractional digits past this many cannot change an `f64` result, so they
/// are validated but not accumulated.
const MAX_FRACTION_DIGITS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty value")]
    Empty,
    #[error("sign without digits")]
    LoneSign,
    #[error("unexpected byte 0x{byte:02x} at position {position}")]
    InvalidByte { byte: u8, position: usize },
    #[error("second decimal point at position {position}")]
    ExtraDecimalPoint { position: usize },
    #[error("no digits before the decimal point")]
    MissingIntegerDigits,
    #[error("no digits after the decimal point")]
    MissingFractionDigits,
}

/// Parses one value token.
///
/// Integer digits accumulate as `acc * 10 + d`. Fractional digits build a
/// separate mantissa that is divided by its power of ten once at the end,
/// which equals summing `d / 10^position` per digit. Only the first
/// [`MAX_FRACTION_DIGITS`] fractional digits are accumulated, which keeps
/// both mantissa and divisor finite for arbitrarily long fractions.
#[inline]
pub fn parse_value(token: &[u8]) -> Result<f64, ParseError> {
    let (negative, digits) = match token.split_first() {
        None => return Err(ParseError::Empty),
        Some((b'-', rest)) => (true, rest),
        Some(_) => (false, token),
    };
    if digits.is_empty() {
        return Err(ParseError::LoneSign);
    }
    let sign_len = usize::from(negative);

    let mut integer = 0.0_f64;
    let mut fraction = 0.0_f64;
    let mut scale = 1.0_f64;
    let mut fraction_digits = 0u32;
    let mut integer_digits = 0usize;
    let mut point: Option<usize> = None;

    for (i, &b) in digits.iter().enumerate() {
        match b {
            b'0'..=b'9' => {
                let d = f64::from(b - b'0');
                if point.is_some() {
                    if fraction_digits < MAX_FRACTION_DIGITS {
                        fraction = fraction * 10.0 + d;
                        scale *= 10.0;
                        fraction_digits += 1;
                    }
                } else {
                    integer = integer * 10.0 + d;
                    integer_digits += 1;
                }
            }
            b'.' if point.is_none() => point = Some(i),
            b'.' => {
                return Err(ParseError::ExtraDecimalPoint { position: i + sign_len });
            }
            _ => {
                return Err(ParseError::InvalidByte { byte: b, position: i + sign_len });
            }
        }
    }

    if integer_digits == 0 {
        return Err(ParseError::MissingIntegerDigits);
    }
    if let Some(p) = point {
        if p + 1 == digits.len() {
            return Err(ParseError::MissingFractionDigits);
        }
    }

    let value = integer + fraction / scale;
    Ok(if negative { -value } else { value })
}

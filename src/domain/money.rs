use std::fmt;

use serde::{Deserialize, Deserializer, Serializer};

/// Amounts are held as integer cents so totals never drift.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000, "1,250.00" -> 125000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    // At most one leading sign
    let (negative, unsigned) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    let digits: String = unsigned.chars().filter(|c| *c != ',').collect();

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (digits.as_str(), ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimal_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    // Pad or truncate the fractional part to two digits
    let mut fraction: String = decimal_str.chars().take(2).collect();
    while fraction.len() < 2 {
        fraction.push('0');
    }
    let fraction: i64 = fraction.parse().map_err(|_| ParseCentsError::InvalidFormat)?;

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

/// Parse an amount the tolerant way: anything that is not a number counts as zero.
pub fn coerce_cents(input: &str) -> Cents {
    match parse_cents(input) {
        Ok(cents) => cents,
        Err(e) => {
            tracing::warn!(value = %input, error = %e, "malformed amount coerced to zero");
            0
        }
    }
}

/// Convert a decimal number of units into cents, rounding to the nearest cent.
/// Values that do not fit in `Cents` count as zero.
pub fn units_to_cents(units: f64) -> Cents {
    let cents = (units * 100.0).round();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    if cents.is_finite() && cents >= i64::MIN as f64 && cents < i64::MAX as f64 {
        cents as Cents
    } else {
        tracing::warn!(value = units, "out-of-range amount coerced to zero");
        0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    Empty,
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::Empty => write!(f, "empty amount"),
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter for optional amounts exchanged as decimal values.
///
/// Reading accepts a JSON number (decimal units), a decimal string or null. Any other
/// value, or a string that does not parse, is coerced to zero cents.
/// Writing emits a decimal string such as `"100.00"`.
pub mod lenient_amount {
    use super::*;

    pub fn serialize<S>(value: &Option<Cents>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(cents) => serializer.serialize_str(&format_cents(*cents)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Cents>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value.and_then(value_to_cents))
    }

    fn value_to_cents(value: serde_json::Value) -> Option<Cents> {
        use serde_json::Value;

        match value {
            Value::Null => None,
            Value::Number(n) => match n.as_i64() {
                Some(units) => Some(units.checked_mul(100).unwrap_or_else(|| {
                    tracing::warn!(value = units, "out-of-range amount coerced to zero");
                    0
                })),
                None => Some(units_to_cents(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Some(coerce_cents(&s)),
            other => {
                tracing::warn!(value = %other, "malformed amount coerced to zero");
                Some(0)
            }
        }
    }
}

//! Integer literal parsing shared by the schema loader (spec.md §4.1, §6):
//! decimal, `0x…`, `0b…`, with an optional leading sign.

use serde_yaml::Value;

use crate::isa::error::SchemaError;

pub fn parse_integer_str(raw: &str) -> Result<i64, SchemaError> {
    let s = raw.trim();
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else {
        rest.parse::<i64>()
    }
    .map_err(|_| SchemaError::InvalidInteger {
        literal: raw.to_string(),
    })?;

    Ok(if neg { -magnitude } else { magnitude })
}

/// Accepts either a native YAML integer/bool or a string using the literal
/// forms above — schemas sometimes quote hex constants so they survive
/// round-tripping through editors that "helpfully" reformat unquoted
/// numbers.
pub fn parse_integer_value(value: &Value) -> Result<i64, SchemaError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(u) = n.as_u64() {
                Ok(u as i64)
            } else {
                Err(SchemaError::InvalidInteger {
                    literal: format!("{n:?}"),
                })
            }
        }
        Value::String(s) => parse_integer_str(s),
        Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
        other => Err(SchemaError::InvalidInteger {
            literal: format!("{other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_hex_binary_and_signs() {
        assert_eq!(parse_integer_str("42").unwrap(), 42);
        assert_eq!(parse_integer_str("-42").unwrap(), -42);
        assert_eq!(parse_integer_str("+42").unwrap(), 42);
        assert_eq!(parse_integer_str("0x2A").unwrap(), 42);
        assert_eq!(parse_integer_str("-0x2A").unwrap(), -42);
        assert_eq!(parse_integer_str("0b101010").unwrap(), 42);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_integer_str("not_a_number").is_err());
        assert!(parse_integer_str("0xzz").is_err());
    }
}

//! Monetary input parsing and BRL display formatting
//!
//! Amounts are plain `f64` throughout the crate. Rounding to two decimals
//! happens only when a value is formatted for display.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("invalid amount '{0}': expected a number like 150, 150,50 or 1.234,56")]
    Invalid(String),

    #[error("amount must not be negative: {0}")]
    Negative(String),
}

/// Parse a user-supplied amount.
///
/// Accepts `150`, `150.5`, `150,50`, `1.234,56`, `1,234.56` and an optional
/// `R$` prefix. Empty input is zero. A lone dot followed by exactly three
/// digits is a thousands separator (`1.500` is 1500), as written in BRL.
pub fn parse_amount(input: &str) -> Result<f64, MoneyError> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Ok(0.0);
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // Both separators: whichever comes last is the decimal mark
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        // Repeated dots can only be thousands separators
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        (None, Some(dot)) if is_thousands_group(&cleaned, dot) => cleaned.replace('.', ""),
        _ => cleaned.clone(),
    };

    let value: f64 = normalized
        .parse()
        .map_err(|_| MoneyError::Invalid(input.to_string()))?;

    if !value.is_finite() {
        return Err(MoneyError::Invalid(input.to_string()));
    }

    Ok(value)
}

fn is_thousands_group(cleaned: &str, dot: usize) -> bool {
    let (whole, rest) = (&cleaned[..dot], &cleaned[dot + 1..]);
    let whole = whole.trim_start_matches('-');
    rest.len() == 3
        && rest.chars().all(|c| c.is_ascii_digit())
        && !whole.is_empty()
        && whole != "0"
}

/// Parse a non-negative amount (prices, discounts)
pub fn parse_price(input: &str) -> Result<f64, MoneyError> {
    let value = parse_amount(input)?;
    if value < 0.0 {
        return Err(MoneyError::Negative(input.to_string()));
    }
    Ok(value)
}

/// Lenient parse used on form-style input (CSV cells, prompts):
/// anything unparseable becomes zero before reaching the calculator
pub fn coerce_amount(input: &str) -> f64 {
    parse_amount(input).unwrap_or(0.0)
}

/// clap value parser for money arguments
pub fn parse_price_arg(input: &str) -> Result<f64, String> {
    parse_price(input).map_err(|e| e.to_string())
}

/// Format an amount as Brazilian reais: `R$ 1.234,56`
pub fn format_brl(value: f64) -> String {
    let negative = value < 0.0 && (value * 100.0).round() != 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-R$ {},{:02}", grouped, frac)
    } else {
        format!("R$ {},{:02}", grouped, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_amount("150").unwrap(), 150.0);
        assert_eq!(parse_amount("150.5").unwrap(), 150.5);
        assert_eq!(parse_amount("150,50").unwrap(), 150.5);
    }

    #[test]
    fn test_parse_grouped_numbers() {
        assert_eq!(parse_amount("1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_amount("1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("R$ 1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_amount("1.234.567").unwrap(), 1234567.0);
    }

    #[test]
    fn test_single_dot_thousands() {
        assert_eq!(parse_amount("1.500").unwrap(), 1500.0);
        assert_eq!(parse_amount("R$ 12.000").unwrap(), 12000.0);
        assert_eq!(parse_amount("-2.500").unwrap(), -2500.0);
        assert_eq!(parse_amount("0.500").unwrap(), 0.5);
        assert_eq!(parse_amount("150.50").unwrap(), 150.5);
        assert_eq!(parse_amount("1.5000").unwrap(), 1.5);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(parse_amount("").unwrap(), 0.0);
        assert_eq!(parse_amount("   ").unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_amount() {
        assert!(matches!(parse_amount("abc"), Err(MoneyError::Invalid(_))));
        assert!(matches!(parse_price("-5"), Err(MoneyError::Negative(_))));
    }

    #[test]
    fn test_coerce_defaults_to_zero() {
        assert_eq!(coerce_amount("abc"), 0.0);
        assert_eq!(coerce_amount(""), 0.0);
        assert_eq!(coerce_amount("45,00"), 45.0);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(465.0), "R$ 465,00");
        assert_eq!(format_brl(1234.567), "R$ 1.234,57");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(format_brl(-30.0), "-R$ 30,00");
    }
}

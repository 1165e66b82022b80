//! Currency formatting helpers

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Format an amount as Indonesian Rupiah, e.g. `Rp 1.250.000`
///
/// Minor units are rounded away; thousands use `.` as separator.
pub fn format_idr(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// Format with an explicit direction sign, e.g. `+Rp 50.000`
pub fn format_signed_idr(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format_idr(amount)
    } else {
        format!("+{}", format_idr(amount))
    }
}

/// Percentage change from `previous` to `current`, two decimals
///
/// Zero previous balance yields `0.00` rather than a division error.
pub fn change_percent(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::new(0, 2);
    }
    let mut pct = ((current - previous) / previous.abs() * Decimal::ONE_HUNDRED).round_dp(2);
    pct.rescale(2);
    pct
}

/// Parse user input like `50000`, `50.000` or `Rp 50.000` into an amount
///
/// A single `.` followed by one or two digits is treated as a decimal point,
/// any other `.` as a thousands separator.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("Rp")
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let dots = cleaned.matches('.').count();
    let normalized = match cleaned.rsplit_once('.') {
        Some((_, tail)) if dots == 1 && (1..=2).contains(&tail.len()) => cleaned,
        _ => cleaned.replace('.', ""),
    };

    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_idr() {
        assert_eq!(format_idr(Decimal::new(1_250_000, 0)), "Rp 1.250.000");
        assert_eq!(format_idr(Decimal::new(999, 0)), "Rp 999");
        assert_eq!(format_idr(Decimal::ZERO), "Rp 0");
        assert_eq!(format_idr(Decimal::new(100_000_050, 2)), "Rp 1.000.001");
        assert_eq!(format_idr(Decimal::new(-30_000, 0)), "-Rp 30.000");
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed_idr(Decimal::new(50_000, 0)), "+Rp 50.000");
        assert_eq!(format_signed_idr(Decimal::new(-3_000, 0)), "-Rp 3.000");
    }

    #[test]
    fn test_change_percent() {
        assert_eq!(change_percent(Decimal::new(150, 0), Decimal::new(100, 0)).to_string(), "50.00");
        assert_eq!(change_percent(Decimal::new(50, 0), Decimal::new(200, 0)).to_string(), "-75.00");
        assert_eq!(change_percent(Decimal::new(10, 0), Decimal::ZERO).to_string(), "0.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50000"), Some(Decimal::new(50_000, 0)));
        assert_eq!(parse_amount("Rp 1.250.000"), Some(Decimal::new(1_250_000, 0)));
        assert_eq!(parse_amount("50.5"), Some(Decimal::new(505, 1)));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }
}

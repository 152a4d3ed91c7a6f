//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount with two decimal places.
///
/// Usage in templates: `{{ product.price|money }}`
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_money(&value.to_string()))
}

/// Two-decimal rendering of `raw`; non-numeric input is passed through.
fn format_money(raw: &str) -> String {
    raw.parse::<Decimal>()
        .map_or_else(|_| raw.to_string(), |amount| format!("{:.2}", amount.round_dp(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("12"), "12.00");
        assert_eq!(format_money("9.5"), "9.50");
        assert_eq!(format_money("19.999"), "20.00");
        assert_eq!(format_money("n/a"), "n/a");
    }
}

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Money is a fixed-point decimal so that deposit-then-withdraw of the same
/// amount restores a balance exactly.
pub type Amount = Decimal;

/// Render an amount in its canonical form, without trailing fractional zeros.
/// Example: 1000 -> "1000", 500.00 -> "500", 12.50 -> "12.5"
pub fn format_amount(amount: Amount) -> String {
    amount.normalize().to_string()
}

/// Parse a decimal string into an amount.
/// Example: "50.00" -> 50.00, "12.5" -> 12.5, "-3" -> -3
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    // Decimal::from_str accepts a leading '+' and underscores; keep to plain numbers
    if !input
        .trim_start_matches('-')
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.')
    {
        return Err(ParseAmountError::InvalidFormat);
    }

    Decimal::from_str(input).map_err(|_| ParseAmountError::InvalidFormat)
}

/// `balance + amount`, or `None` if the sum overflows or cannot be held
/// without rounding away part of `amount`.
pub fn exact_add(balance: Amount, amount: Amount) -> Option<Amount> {
    let sum = balance.checked_add(amount)?;
    (sum.checked_sub(balance)? == amount).then_some(sum)
}

/// `balance - amount`, or `None` if the difference overflows or cannot be
/// held without rounding away part of `amount`.
pub fn exact_sub(balance: Amount, amount: Amount) -> Option<Amount> {
    let difference = balance.checked_sub(amount)?;
    (balance.checked_sub(difference)? == amount).then_some(difference)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

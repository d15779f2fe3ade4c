use thiserror::Error;

use super::{format_amount, AccountId, Amount};

/// Every way an operation on the ledger core can be rejected.
/// A rejected operation never leaves a partial mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid amount: {}", amount_text(.0))]
    InvalidAmount(Amount),

    #[error(
        "Insufficient funds: balance {}, requested {}",
        amount_text(.balance),
        amount_text(.requested)
    )]
    InsufficientFunds { balance: Amount, requested: Amount },

    #[error("Account already exists: {0}")]
    DuplicateAccount(AccountId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
}

/// Amounts in messages use the same canonical text as history lines.
fn amount_text(amount: &Amount) -> String {
    format_amount(*amount)
}

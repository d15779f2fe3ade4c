use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{exact_add, exact_sub, format_amount, Amount, LedgerError};

pub type AccountId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// The opening balance, always the first entry of a log
    Opened,
    Deposit,
    Withdrawal,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Opened => "opened",
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "opened" => Some(EntryKind::Opened),
            "deposit" => Some(EntryKind::Deposit),
            "withdrawal" => Some(EntryKind::Withdrawal),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of an account's transaction log.
/// Displays as the human-readable history line, e.g. "Deposited: 500".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: EntryKind,
    pub amount: Amount,
    pub recorded_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(kind: EntryKind, amount: Amount) -> Self {
        Self {
            kind,
            amount,
            recorded_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let amount = format_amount(self.amount);
        match self.kind {
            EntryKind::Opened => write!(f, "Account opened with balance: {}", amount),
            EntryKind::Deposit => write!(f, "Deposited: {}", amount),
            EntryKind::Withdrawal => write!(f, "Withdrawn: {}", amount),
        }
    }
}

/// A ledger account: a balance plus the append-only log of every event that
/// changed it. State only changes through `deposit` and `withdraw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    holder_name: String,
    balance: Amount,
    log: Vec<LogEntry>,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Open an account. The opening balance is taken as given and is not
    /// subject to the positivity rule that deposits and withdrawals follow.
    pub fn open(id: impl Into<AccountId>, holder_name: impl Into<String>, opening: Amount) -> Self {
        let opened = LogEntry::new(EntryKind::Opened, opening);
        Self {
            id: id.into(),
            holder_name: holder_name.into(),
            balance: opening,
            created_at: opened.recorded_at,
            log: vec![opened],
        }
    }

    /// Reassemble an account from stored parts. Callers must have checked
    /// that `log` is non-empty and starts with an `Opened` entry.
    pub(crate) fn from_parts(
        id: AccountId,
        holder_name: String,
        balance: Amount,
        created_at: DateTime<Utc>,
        log: Vec<LogEntry>,
    ) -> Self {
        Self {
            id,
            holder_name,
            balance,
            log,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Read-only view of the typed log.
    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    /// The log rendered as history lines. The returned vector is a copy.
    pub fn transaction_history(&self) -> Vec<String> {
        self.log.iter().map(ToString::to_string).collect()
    }

    pub fn deposit(&mut self, amount: Amount) -> Result<&LogEntry, LedgerError> {
        if amount <= Amount::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let balance =
            exact_add(self.balance, amount).ok_or(LedgerError::InvalidAmount(amount))?;

        Ok(self.record(balance, EntryKind::Deposit, amount))
    }

    pub fn withdraw(&mut self, amount: Amount) -> Result<&LogEntry, LedgerError> {
        if amount <= Amount::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }

        let balance =
            exact_sub(self.balance, amount).ok_or(LedgerError::InvalidAmount(amount))?;

        Ok(self.record(balance, EntryKind::Withdrawal, amount))
    }

    fn record(&mut self, balance: Amount, kind: EntryKind, amount: Amount) -> &LogEntry {
        self.balance = balance;
        self.log.push(LogEntry::new(kind, amount));
        &self.log[self.log.len() - 1]
    }
}

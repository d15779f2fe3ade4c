use anyhow::Result;
use std::collections::HashSet;
use std::io::Read;

use crate::application::{AccountStatement, AppError, BankService};
use crate::domain::{
    exact_add, exact_sub, format_amount, Account, AccountId, Amount, EntryKind, LedgerError,
};
use crate::io::export::RegistrySnapshot;

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    /// Position of the account in the snapshot, starting at 1
    pub record: usize,
    pub account: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
}

/// Importer for loading snapshot data into the ledger
pub struct Importer<'a> {
    service: &'a BankService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Import accounts from a JSON snapshot. Each account's log is checked
    /// against its recorded balance before anything is stored.
    pub async fn import_full_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: RegistrySnapshot = serde_json::from_reader(reader)?;

        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();
        let mut accepted: HashSet<AccountId> = HashSet::new();

        for (index, statement) in snapshot.accounts.into_iter().enumerate() {
            let record = index + 1;
            let id = statement.id.clone();

            let account = match statement_to_account(statement) {
                Ok(account) => account,
                Err(e) => {
                    errors.push(ImportError {
                        record,
                        account: Some(id),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            // Ids taken earlier in this snapshot count as existing, so a dry
            // run reports the same outcome as the real import
            if accepted.contains(&id) || self.service.contains(&id).await {
                if options.skip_duplicates {
                    skipped += 1;
                } else {
                    errors.push(ImportError {
                        record,
                        account: Some(id.clone()),
                        error: LedgerError::DuplicateAccount(id).to_string(),
                    });
                }
                continue;
            }

            if options.dry_run {
                imported += 1;
                accepted.insert(id);
                continue;
            }

            match self.service.restore_account(account).await {
                Ok(_) => {
                    imported += 1;
                    accepted.insert(id);
                }
                Err(AppError::Ledger(LedgerError::DuplicateAccount(_)))
                    if options.skip_duplicates =>
                {
                    skipped += 1;
                }
                Err(e) => errors.push(ImportError {
                    record,
                    account: Some(id),
                    error: format!("Account import failed: {}", e),
                }),
            }
        }

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }
}

/// Rebuild an account from a statement, replaying its log to check that it
/// opens exactly once, never overdraws and ends on the recorded balance.
pub fn statement_to_account(statement: AccountStatement) -> Result<Account> {
    let (opening, rest) = match statement.entries.split_first() {
        Some((first, rest)) if first.kind == EntryKind::Opened => (first, rest),
        _ => anyhow::bail!("Log must start with an opening entry"),
    };

    let mut balance = opening.amount;
    for (offset, entry) in rest.iter().enumerate() {
        let position = offset + 1;
        anyhow::ensure!(
            entry.amount > Amount::ZERO,
            "Entry {} has non-positive amount {}",
            position,
            format_amount(entry.amount)
        );
        balance = match entry.kind {
            EntryKind::Opened => anyhow::bail!("Entry {} reopens the account", position),
            EntryKind::Deposit => exact_add(balance, entry.amount).ok_or_else(|| {
                anyhow::anyhow!("Entry {} cannot be added to the balance exactly", position)
            })?,
            EntryKind::Withdrawal => {
                anyhow::ensure!(
                    entry.amount <= balance,
                    "Entry {} withdraws {} from a balance of {}",
                    position,
                    format_amount(entry.amount),
                    format_amount(balance)
                );
                exact_sub(balance, entry.amount).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Entry {} cannot be taken from the balance exactly",
                        position
                    )
                })?
            }
        };
    }

    anyhow::ensure!(
        balance == statement.balance,
        "Recorded balance {} does not match log total {}",
        format_amount(statement.balance),
        format_amount(balance)
    );

    Ok(Account::from_parts(
        statement.id,
        statement.holder_name,
        statement.balance,
        statement.created_at,
        statement.entries,
    ))
}

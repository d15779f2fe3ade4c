use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    format_amount, Account, AccountId, AccountRegistry, Amount, LedgerError, LogEntry,
};
use crate::storage::Repository;

use super::AppError;

/// Application service owning one account registry and its storage.
/// This is the primary interface for any client (CLI, importer, exporter).
///
/// The registry sits behind a single lock which is held for the whole of a
/// mutation, including its write to storage.
pub struct BankService {
    repo: Repository,
    registry: Mutex<AccountRegistry>,
}

/// Detailed account information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: AccountId,
    pub holder_name: String,
    pub balance: Amount,
    pub entry_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        let entries = account.entries();
        Self {
            id: account.id().to_string(),
            holder_name: account.holder_name().to_string(),
            balance: account.balance(),
            entry_count: entries.len(),
            created_at: account.created_at(),
            last_activity: entries
                .last()
                .map(|e| e.recorded_at)
                .unwrap_or_else(|| account.created_at()),
        }
    }
}

/// Full statement of one account: identity, balance and every log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub id: AccountId,
    pub holder_name: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<LogEntry>,
}

impl From<&Account> for AccountStatement {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id().to_string(),
            holder_name: account.holder_name().to_string(),
            balance: account.balance(),
            created_at: account.created_at(),
            entries: account.entries().to_vec(),
        }
    }
}

impl BankService {
    /// Create a new service over a repository and an already loaded registry.
    pub fn new(repo: Repository, registry: AccountRegistry) -> Self {
        Self {
            repo,
            registry: Mutex::new(registry),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Self::load(repo).await
    }

    /// Connect to an existing database and load every account from it.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Self::load(repo).await
    }

    async fn load(repo: Repository) -> Result<Self, AppError> {
        let accounts = repo.load_accounts().await?;
        let registry = AccountRegistry::from_accounts(accounts)?;
        debug!(accounts = registry.len(), "registry loaded");
        Ok(Self::new(repo, registry))
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account. The opening balance is recorded as given.
    pub async fn create_account(
        &self,
        id: &str,
        holder_name: &str,
        opening_balance: Amount,
    ) -> Result<AccountInfo, AppError> {
        let mut registry = self.registry.lock().await;
        let account = registry
            .create_account(id, holder_name, opening_balance)
            .inspect_err(|err| warn!(account = id, %err, "account creation rejected"))?
            .clone();

        if let Err(err) = self.repo.save_account(&account).await {
            registry.discard(id);
            return Err(err.into());
        }

        info!(
            account = id,
            holder = holder_name,
            opening = %format_amount(opening_balance),
            "account opened"
        );
        Ok(AccountInfo::from(&account))
    }

    /// Add a previously built account, e.g. one read from a snapshot.
    pub async fn restore_account(&self, account: Account) -> Result<AccountInfo, AppError> {
        let mut registry = self.registry.lock().await;
        let stored = registry
            .insert(account)
            .inspect_err(|err| warn!(%err, "account restore rejected"))?;
        let info = AccountInfo::from(stored);

        let saved = self.repo.save_account(stored).await;
        if let Err(err) = saved {
            registry.discard(&info.id);
            return Err(err.into());
        }

        info!(account = %info.id, entries = info.entry_count, "account restored");
        Ok(info)
    }

    /// Deposit into an account, returning the new balance.
    pub async fn deposit(&self, id: &str, amount: Amount) -> Result<Amount, AppError> {
        self.apply("deposit", id, amount, |registry| {
            registry.deposit(id, amount).map(|_| ())
        })
        .await
    }

    /// Withdraw from an account, returning the new balance.
    pub async fn withdraw(&self, id: &str, amount: Amount) -> Result<Amount, AppError> {
        self.apply("withdrawal", id, amount, |registry| {
            registry.withdraw(id, amount).map(|_| ())
        })
        .await
    }

    /// Run one balance-changing operation and persist the entry it appended.
    /// If the write fails the account is put back as it was.
    async fn apply<F>(
        &self,
        operation: &'static str,
        id: &str,
        amount: Amount,
        op: F,
    ) -> Result<Amount, AppError>
    where
        F: FnOnce(&mut AccountRegistry) -> Result<(), LedgerError>,
    {
        let mut registry = self.registry.lock().await;
        let before = registry
            .lookup(id)
            .inspect_err(|err| warn!(account = id, operation, %err, "operation rejected"))?
            .clone();

        op(&mut *registry).inspect_err(|err| {
            warn!(account = id, operation, %err, "operation rejected")
        })?;

        let account = registry.lookup(id)?;
        let balance = account.balance();
        let saved = self.repo.append_entry(account).await;
        if let Err(err) = saved {
            registry.restore(before);
            return Err(err.into());
        }

        info!(
            account = id,
            operation,
            amount = %format_amount(amount),
            balance = %format_amount(balance),
            "entry recorded"
        );
        Ok(balance)
    }

    /// Current balance of an account.
    pub async fn balance(&self, id: &str) -> Result<Amount, AppError> {
        Ok(self.registry.lock().await.balance(id)?)
    }

    /// The account's history rendered as lines, oldest first.
    pub async fn transaction_history(&self, id: &str) -> Result<Vec<String>, AppError> {
        Ok(self.registry.lock().await.transaction_history(id)?)
    }

    /// Get detailed account information.
    pub async fn get_account(&self, id: &str) -> Result<AccountInfo, AppError> {
        let registry = self.registry.lock().await;
        Ok(AccountInfo::from(registry.lookup(id)?))
    }

    /// Full statement of one account.
    pub async fn statement(&self, id: &str) -> Result<AccountStatement, AppError> {
        let registry = self.registry.lock().await;
        Ok(AccountStatement::from(registry.lookup(id)?))
    }

    /// List all accounts, ordered by id.
    pub async fn list_accounts(&self) -> Vec<AccountInfo> {
        let registry = self.registry.lock().await;
        registry.accounts().into_iter().map(AccountInfo::from).collect()
    }

    /// Statements for every account, ordered by id.
    pub async fn all_statements(&self) -> Vec<AccountStatement> {
        let registry = self.registry.lock().await;
        registry
            .accounts()
            .into_iter()
            .map(AccountStatement::from)
            .collect()
    }

    /// Whether an account with this id is present.
    pub async fn contains(&self, id: &str) -> bool {
        self.registry.lock().await.contains(id)
    }

    /// Number of accounts as recorded in storage.
    pub async fn stored_account_count(&self) -> Result<i64, AppError> {
        Ok(self.repo.count_accounts().await?)
    }
}

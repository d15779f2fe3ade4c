use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{Account, Amount, EntryKind, LogEntry};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting accounts and their transaction logs.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Save a newly opened account together with its whole log.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, holder_name, balance, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(account.id())
        .bind(account.holder_name())
        .bind(account.balance().to_string())
        .bind(account.created_at().to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save account")?;

        for (position, entry) in account.entries().iter().enumerate() {
            Self::insert_entry(&mut tx, account.id(), position as i64, entry).await?;
        }

        tx.commit().await.context("Failed to commit account")?;
        Ok(())
    }

    /// Persist the most recent log entry of `account` along with its new
    /// balance.
    pub async fn append_entry(&self, account: &Account) -> Result<()> {
        let entries = account.entries();
        let position = entries.len() - 1;
        let entry = &entries[position];

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let updated = sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
            .bind(account.balance().to_string())
            .bind(account.id())
            .execute(&mut *tx)
            .await
            .context("Failed to update balance")?;
        anyhow::ensure!(
            updated.rows_affected() == 1,
            "Account {} is missing from the database",
            account.id()
        );

        Self::insert_entry(&mut tx, account.id(), position as i64, entry).await?;

        tx.commit().await.context("Failed to commit entry")?;
        Ok(())
    }

    async fn insert_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        account_id: &str,
        position: i64,
        entry: &LogEntry,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (account_id, position, kind, amount, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account_id)
        .bind(position)
        .bind(entry.kind.as_str())
        .bind(entry.amount.to_string())
        .bind(entry.recorded_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .context("Failed to save log entry")?;
        Ok(())
    }

    /// Load every account with its log, ordered by id.
    pub async fn load_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, holder_name, balance, created_at FROM accounts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let log = self.load_entries(&id).await?;
            accounts.push(Self::row_to_account(row, log)?);
        }
        Ok(accounts)
    }

    async fn load_entries(&self, account_id: &str) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT position, kind, amount, recorded_at
            FROM entries
            WHERE account_id = ?
            ORDER BY position
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load entries for account {}", account_id))?;

        rows.iter()
            .enumerate()
            .map(|(expected, row)| {
                let position: i64 = row.get("position");
                anyhow::ensure!(
                    position == expected as i64,
                    "Gap in log of account {} at position {}",
                    account_id,
                    expected
                );
                Self::row_to_entry(row)
            })
            .collect()
    }

    /// Count stored accounts.
    pub async fn count_accounts(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count accounts")?;
        Ok(row.get("count"))
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow, log: Vec<LogEntry>) -> Result<Account> {
        let id: String = row.get("id");
        let balance_str: String = row.get("balance");
        let created_at_str: String = row.get("created_at");

        anyhow::ensure!(
            log.first().map(|e| e.kind) == Some(EntryKind::Opened),
            "Log of account {} does not start with an opening entry",
            id
        );

        Ok(Account::from_parts(
            id,
            row.get("holder_name"),
            Amount::from_str(&balance_str).context("Invalid balance")?,
            parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            log,
        ))
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LogEntry> {
        let kind_str: String = row.get("kind");
        let amount_str: String = row.get("amount");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(LogEntry {
            kind: EntryKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid entry kind: {}", kind_str))?,
            amount: Amount::from_str(&amount_str).context("Invalid entry amount")?,
            recorded_at: parse_timestamp(&recorded_at_str)
                .context("Invalid recorded_at timestamp")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

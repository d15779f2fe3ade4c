use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{AccountStatement, BankService};
use crate::domain::format_amount;

/// Snapshot of every account for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<AccountStatement>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a BankService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export one row per account to CSV format
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts().await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "holder_name",
            "balance",
            "entries",
            "created_at",
            "last_activity",
        ])?;

        for account in &accounts {
            csv_writer.write_record([
                account.id.clone(),
                account.holder_name.clone(),
                format_amount(account.balance),
                account.entry_count.to_string(),
                account.created_at.to_rfc3339(),
                account.last_activity.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export every log entry of every account to CSV format
    pub async fn export_history_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let statements = self.service.all_statements().await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "account_id",
            "position",
            "kind",
            "amount",
            "recorded_at",
            "description",
        ])?;

        let mut count = 0;
        for statement in &statements {
            for (position, entry) in statement.entries.iter().enumerate() {
                csv_writer.write_record([
                    statement.id.clone(),
                    position.to_string(),
                    entry.kind.as_str().to_string(),
                    format_amount(entry.amount),
                    entry.recorded_at.to_rfc3339(),
                    entry.to_string(),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export every account as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<RegistrySnapshot> {
        let snapshot = RegistrySnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts: self.service.all_statements().await,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

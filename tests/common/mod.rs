// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use rust_decimal_macros::dec;
use tally::application::BankService;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = BankService::init(&db_path(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Path of the database file inside a test directory
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Test fixture: Standard account setup
pub struct StandardAccounts;

impl StandardAccounts {
    /// Open "1001" (1000), "1002" (250.50) and "1003" (0)
    pub async fn create_basic(service: &BankService) -> Result<()> {
        service
            .create_account("1001", "Parth Bishnoi", dec!(1000))
            .await?;
        service
            .create_account("1002", "Ada Lovelace", dec!(250.50))
            .await?;
        service.create_account("1003", "Alan Turing", dec!(0)).await?;
        Ok(())
    }
}

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{db_path, test_service, StandardAccounts};
use rust_decimal_macros::dec;
use tally::application::{AppError, BankService};
use tally::domain::LedgerError;

#[tokio::test]
async fn test_create_deposit_withdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create_basic(&service).await?;

    assert_eq!(service.deposit("1001", dec!(500)).await?, dec!(1500));
    assert_eq!(service.withdraw("1001", dec!(200)).await?, dec!(1300));
    assert_eq!(service.balance("1001").await?, dec!(1300));

    let history = service.transaction_history("1001").await?;
    assert_eq!(
        history,
        vec![
            "Account opened with balance: 1000",
            "Deposited: 500",
            "Withdrawn: 200",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_failures_surface_ledger_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create_basic(&service).await?;

    let err = service.withdraw("1001", dec!(5000)).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Ledger(LedgerError::InsufficientFunds { .. })
    ));

    let err = service.deposit("1001", dec!(-1)).await.unwrap_err();
    assert_eq!(err.as_ledger(), Some(&LedgerError::InvalidAmount(dec!(-1))));

    let err = service.balance("nope").await.unwrap_err();
    assert_eq!(
        err.as_ledger(),
        Some(&LedgerError::AccountNotFound("nope".into()))
    );

    let err = service
        .create_account("1001", "Impostor", dec!(0))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Account already exists: 1001");

    let info = service.get_account("1001").await?;
    assert_eq!(info.holder_name, "Parth Bishnoi");
    assert_eq!(info.balance, dec!(1000));
    assert_eq!(info.entry_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_state_survives_reconnect() -> Result<()> {
    let (service, temp) = test_service().await?;
    StandardAccounts::create_basic(&service).await?;
    service.deposit("1002", dec!(0.25)).await?;
    service.withdraw("1002", dec!(100)).await?;
    let _ = service.withdraw("1003", dec!(1)).await;
    let before = service.all_statements().await;
    drop(service);

    let reopened = BankService::connect(&db_path(&temp)).await?;
    assert_eq!(reopened.all_statements().await, before);
    assert_eq!(reopened.balance("1002").await?, dec!(150.75));
    assert_eq!(reopened.transaction_history("1003").await?.len(), 1);
    assert_eq!(reopened.stored_account_count().await?, 3);

    // New entries continue the stored log
    reopened.deposit("1002", dec!(9.25)).await?;
    drop(reopened);

    let again = BankService::connect(&db_path(&temp)).await?;
    assert_eq!(again.balance("1002").await?, dec!(160));
    assert_eq!(
        again.transaction_history("1002").await?,
        vec![
            "Account opened with balance: 250.5",
            "Deposited: 0.25",
            "Withdrawn: 100",
            "Deposited: 9.25",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_list_accounts_ordered() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.create_account("b", "Second", dec!(2)).await?;
    service.create_account("a", "First", dec!(1)).await?;
    service.create_account("c", "Third", dec!(3)).await?;

    let ids: Vec<String> = service
        .list_accounts()
        .await
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    Ok(())
}

#[tokio::test]
async fn test_statement() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create_basic(&service).await?;
    service.deposit("1003", dec!(42)).await?;

    let statement = service.statement("1003").await?;
    assert_eq!(statement.id, "1003");
    assert_eq!(statement.holder_name, "Alan Turing");
    assert_eq!(statement.balance, dec!(42));
    assert_eq!(statement.entries.len(), 2);
    assert_eq!(statement.created_at, statement.entries[0].recorded_at);

    let info = service.get_account("1003").await?;
    assert_eq!(info.last_activity, statement.entries[1].recorded_at);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_serialized() -> Result<()> {
    let (service, temp) = test_service().await?;
    let service = Arc::new(service);
    service.create_account("shared", "Shared", dec!(0)).await?;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.deposit("shared", dec!(1.5)).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(service.balance("shared").await?, dec!(30));
    assert_eq!(service.transaction_history("shared").await?.len(), 21);
    drop(service);

    let reopened = BankService::connect(&db_path(&temp)).await?;
    assert_eq!(reopened.balance("shared").await?, dec!(30));
    assert_eq!(reopened.transaction_history("shared").await?.len(), 21);

    Ok(())
}

#[tokio::test]
async fn test_connect_to_missing_database_fails() -> Result<()> {
    let temp = tempfile::TempDir::new()?;
    let result = BankService::connect(&db_path(&temp)).await;
    assert!(matches!(result, Err(AppError::Database(_))));
    Ok(())
}

#[tokio::test]
async fn test_failed_write_rolls_back_memory() -> Result<()> {
    let (service, temp) = test_service().await?;
    service.create_account("1001", "Parth Bishnoi", dec!(10)).await?;

    // Break the entries table behind the service's back
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", db_path(&temp))).await?;
    sqlx::query("DROP TABLE entries").execute(&pool).await?;
    pool.close().await;

    let err = service.deposit("1001", dec!(5)).await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(service.balance("1001").await?, dec!(10));
    assert_eq!(service.transaction_history("1001").await?.len(), 1);

    let err = service.withdraw("1001", dec!(4)).await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(service.balance("1001").await?, dec!(10));
    assert_eq!(service.transaction_history("1001").await?.len(), 1);

    let err = service
        .create_account("1002", "Ada Lovelace", dec!(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert!(!service.contains("1002").await);
    assert_eq!(service.list_accounts().await.len(), 1);
    assert_eq!(service.stored_account_count().await?, 1);

    // Rejections are still decided by the ledger before any write
    let err = service.withdraw("1001", dec!(50)).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Ledger(LedgerError::InsufficientFunds { .. })
    ));

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::BankService;
use crate::domain::{format_amount, parse_amount, Amount};

/// Tally - Account Ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "An account ledger with deposits, withdrawals and a full transaction history")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "tally.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into an account
    Deposit {
        /// Account id
        id: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account id
        id: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Show the balance of an account
    Balance {
        /// Account id
        id: String,
    },

    /// Print the transaction history of an account
    History {
        /// Account id
        id: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: accounts, history, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import accounts from a JSON snapshot
    Import {
        /// Input file (stdin if omitted)
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip accounts that already exist
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account id (must be unique)
        id: String,

        /// Name of the account holder
        #[arg(long)]
        holder: String,

        /// Opening balance
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        opening: String,
    },

    /// List all accounts
    List,

    /// Show detailed account information
    Show {
        /// Account id
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                let service = BankService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
                let count = service.stored_account_count().await?;
                if count > 0 {
                    println!("  Existing accounts: {}", count);
                }
            }

            Commands::Account(account_cmd) => {
                let service = BankService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Deposit { id, amount } => {
                let service = BankService::connect(&self.database).await?;
                let amount = parse_amount_arg(&amount)?;
                let balance = service.deposit(&id, amount).await?;
                println!(
                    "Deposited {} into {} (balance: {})",
                    format_amount(amount),
                    id,
                    format_amount(balance)
                );
            }

            Commands::Withdraw { id, amount } => {
                let service = BankService::connect(&self.database).await?;
                let amount = parse_amount_arg(&amount)?;
                let balance = service.withdraw(&id, amount).await?;
                println!(
                    "Withdrew {} from {} (balance: {})",
                    format_amount(amount),
                    id,
                    format_amount(balance)
                );
            }

            Commands::Balance { id } => {
                let service = BankService::connect(&self.database).await?;
                let balance = service.balance(&id).await?;
                println!("Balance: {}", format_amount(balance));
            }

            Commands::History { id } => {
                let service = BankService::connect(&self.database).await?;
                let info = service.get_account(&id).await?;
                println!("Transaction history for {}:", info.holder_name);
                for line in service.transaction_history(&id).await? {
                    println!("{}", line);
                }
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = BankService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }

            Commands::Import {
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = BankService::connect(&self.database).await?;
                run_import_command(&service, input.as_deref(), dry_run, skip_duplicates)
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &BankService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            id,
            holder,
            opening,
        } => {
            let opening = parse_amount_arg(&opening)?;
            let info = service.create_account(&id, &holder, opening).await?;
            println!(
                "Created account: {} ({}) with balance {}",
                info.id,
                info.holder_name,
                format_amount(info.balance)
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<12} {:<24} {:>14}", "ID", "HOLDER", "BALANCE");
                println!("{}", "-".repeat(52));
                for account in accounts {
                    println!(
                        "{:<12} {:<24} {:>14}",
                        account.id,
                        account.holder_name,
                        format_amount(account.balance)
                    );
                }
            }
        }

        AccountCommands::Show { id } => {
            let info = service.get_account(&id).await?;

            println!("Account: {}", info.id);
            println!("  Holder:         {}", info.holder_name);
            println!(
                "  Created:        {}",
                info.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  Balance:        {}", format_amount(info.balance));
            println!("  Entries:        {}", info.entry_count);
            println!(
                "  Last activity:  {}",
                info.last_activity.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &BankService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "accounts" => {
            let count = exporter.export_accounts_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} accounts", count);
            }
        }
        "history" => {
            let count = exporter.export_history_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} history entries", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full snapshot: {} accounts",
                    snapshot.accounts.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: accounts, history, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &BankService,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{stdin, Read};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };

    let result = importer.import_full_json(reader, options).await?;

    if dry_run {
        println!("Dry run complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Record {}: {}",
                error.record,
                error
                    .account
                    .as_ref()
                    .map(|a| format!("{}: ", a))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn parse_amount_arg(input: &str) -> Result<Amount> {
    parse_amount(input).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

/// Log level used when RUST_LOG is unset.
pub fn default_log_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

// Application layer: the shared, persisted handle around the ledger core.
// Clients (the CLI, the importer/exporter) go through `BankService`.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;

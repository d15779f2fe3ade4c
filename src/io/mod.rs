// Data exchange: CSV/JSON export and JSON snapshot import.

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;

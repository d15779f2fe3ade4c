mod account;
mod error;
mod money;
mod registry;

pub use account::*;
pub use error::*;
pub use money::*;
pub use registry::*;

//! Loader/Cleaner: spreadsheet in, pipe-delimited CSV out.

pub mod clean;
pub mod export;
pub mod record;
pub mod sheet;

pub use clean::*;
pub use export::*;
pub use record::*;
pub use sheet::*;

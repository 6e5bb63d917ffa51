pub mod record;
pub mod schema_gen;
pub mod sqlite;

pub use record::*;
pub use schema_gen::*;
pub use sqlite::*;

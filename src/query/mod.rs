//! SQL run against the sales table: schema and data fixes first, then the
//! analytical queries.

pub mod analytics;
pub mod transform;

pub use analytics::*;
pub use transform::*;

use std::fmt;

/// Order year expression shared by every query
pub(crate) const ORDER_YEAR_SQL: &str = "CAST(strftime('%Y', \"Order Date\") AS INTEGER)";

/// Inclusive range of order years an analysis covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub start: i32,
    pub end: i32,
}

impl YearWindow {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }
}

impl Default for YearWindow {
    fn default() -> Self {
        Self::new(2012, 2015)
    }
}

impl fmt::Display for YearWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

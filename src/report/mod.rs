//! Reporting: console tables, CSV exports and SVG charts of query results

pub mod charts;
pub mod tables;

pub use charts::*;
pub use tables::*;

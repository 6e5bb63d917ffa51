use thiserror::Error;

/// Errors raised by the sales pipeline itself. Library failures (I/O, csv,
/// SQLite, rendering) travel as `anyhow` errors with context attached.
#[derive(Error, Debug)]
pub enum SalesError {
    #[error("Required column '{0}' not found in header")]
    MissingColumn(String),

    #[error("Row {row}: cannot parse '{value}' in column '{column}' as a date")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: cannot parse '{value}' in column '{column}' as a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Table '{0}' does not exist in the database")]
    MissingTable(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Input sheet is empty")]
    EmptySheet,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

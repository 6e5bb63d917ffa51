use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;

use crate::error::SalesError;

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text form written to the cleaned CSV
    pub fn to_field(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) if s.is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(Cell::DateTime)
                .unwrap_or(Cell::Number(dt.as_f64())),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// In-memory table: a header row plus data rows of equal width
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Result<usize, SalesError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SalesError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read the first worksheet of a workbook, or a comma-separated file when
/// the path ends in `.csv`. The first row is the header.
pub fn read_sheet(path: &Path) -> Result<Sheet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv_sheet(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_sheet(path),
        _ => Err(SalesError::UnsupportedFormat(path.display().to_string()).into()),
    }
}

fn read_workbook_sheet(path: &Path) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {:?}", path))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SalesError::EmptySheet)?
        .with_context(|| format!("Failed to read first worksheet of {:?}", path))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(SalesError::EmptySheet)?;
    let headers = header_row.iter().map(|c| c.to_string().trim().to_string()).collect();

    let mut sheet = Sheet::new(headers);
    for row in rows {
        // Trailing blank rows are common in exported workbooks
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        sheet.push_row(row.iter().map(Cell::from).collect());
    }

    Ok(sheet)
}

fn read_csv_sheet(path: &Path) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("Failed to open: {:?}", path))?;

    let headers = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    if headers.is_empty() {
        return Err(SalesError::EmptySheet.into());
    }

    let mut sheet = Sheet::new(headers);
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read record in {:?}", path))?;
        sheet.push_row(record.iter().map(text_cell).collect());
    }

    Ok(sheet)
}

pub(crate) fn text_cell(field: &str) -> Cell {
    if field.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cell_to_field() {
        assert_eq!(Cell::Number(3.0).to_field(), "3");
        assert_eq!(Cell::Number(12.5).to_field(), "12.5");
        assert_eq!(Cell::Empty.to_field(), "");
        let d = NaiveDate::from_ymd_opt(2013, 2, 1).unwrap();
        assert_eq!(Cell::Date(d).to_field(), "2013-02-01");
    }

    #[test]
    fn test_read_csv_sheet() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Product Name,Order Date,Sales").unwrap();
        writeln!(file, "Chair,1/5/2012,10.5").unwrap();
        writeln!(file, "Desk,,7").unwrap();
        file.flush().unwrap();

        let sheet = read_sheet(file.path()).unwrap();
        assert_eq!(sheet.headers, vec!["Product Name", "Order Date", "Sales"]);
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.rows[1][1], Cell::Empty);
        assert_eq!(sheet.column_index("Sales").unwrap(), 2);
        assert!(sheet.column_index("Profit").is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_sheet(Path::new("sales.txt")).unwrap_err();
        assert!(err.to_string().contains("Unsupported input format"));
    }

    #[test]
    fn test_missing_workbook_fails() {
        assert!(read_sheet(Path::new("/nonexistent/sales.xlsx")).is_err());
    }
}

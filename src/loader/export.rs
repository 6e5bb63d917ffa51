use anyhow::{ensure, Context, Result};
use csv::QuoteStyle;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::record::SalesRecord;
use super::sheet::{text_cell, Sheet};

/// Cleaned CSV dialect: pipe-delimited, every field quoted, quotes escaped
/// with a backslash instead of doubled.
pub const DELIMITER: u8 = b'|';
pub const ESCAPE: u8 = b'\\';

pub fn open_cleaned_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote_style(QuoteStyle::Always)
        .double_quote(false)
        .escape(ESCAPE)
        .from_writer(writer)
}

pub fn open_cleaned_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .double_quote(false)
        .escape(Some(ESCAPE))
        .has_headers(true)
        .flexible(false)
        .from_reader(reader)
}

/// The csv writer only escapes the quote character. Doubling the escape
/// character itself lets the reader restore literal backslashes.
fn escape_field(field: &str) -> String {
    field.replace('\\', "\\\\")
}

/// Write the sheet with its header row and no index column. Returns the
/// number of data rows written.
pub fn write_cleaned_csv(sheet: &Sheet, path: &Path) -> Result<u64> {
    let file = File::create(path).with_context(|| format!("Failed to create: {:?}", path))?;
    let mut writer = open_cleaned_writer(BufWriter::new(file));

    writer
        .write_record(sheet.headers.iter().map(|h| escape_field(h)))
        .context("Failed to write CSV header")?;

    let mut count: u64 = 0;
    for row in &sheet.rows {
        writer
            .write_record(row.iter().map(|c| escape_field(&c.to_field())))
            .with_context(|| format!("Failed to write row {}", count + 1))?;
        count += 1;
    }

    writer.flush().context("Failed to flush cleaned CSV")?;
    Ok(count)
}

/// Read a cleaned CSV back into a sheet of text cells
pub fn read_cleaned_csv(path: &Path) -> Result<Sheet> {
    let file = File::open(path).with_context(|| format!("Failed to open: {:?}", path))?;
    let mut reader = open_cleaned_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut sheet = Sheet::new(headers);
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read record in {:?}", path))?;
        sheet.push_row(record.iter().map(text_cell).collect());
    }

    Ok(sheet)
}

/// Summary of a cleaned file as read back through the typed record
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSummary {
    pub rows: u64,
    pub first_order: Option<chrono::NaiveDate>,
    pub last_order: Option<chrono::NaiveDate>,
    pub states: usize,
    pub regions: usize,
}

/// Re-read the cleaned file as sales records and check it holds
/// `expected_rows` rows with valid dates and ASCII product names.
pub fn verify_cleaned_csv(path: &Path, expected_rows: u64) -> Result<CleanedSummary> {
    let file = File::open(path).with_context(|| format!("Failed to open: {:?}", path))?;
    let mut reader = open_cleaned_reader(BufReader::new(file));

    let mut summary = CleanedSummary {
        rows: 0,
        first_order: None,
        last_order: None,
        states: 0,
        regions: 0,
    };
    let mut states = std::collections::HashSet::new();
    let mut regions = std::collections::HashSet::new();

    for (i, result) in reader.deserialize::<SalesRecord>().enumerate() {
        let record = result.with_context(|| format!("Failed to decode row {}", i + 2))?;
        ensure!(
            record.product_name.as_deref().map_or(true, |n| n.is_ascii()),
            "Row {}: product name is not ASCII",
            i + 2
        );
        if let Some(date) = record.order_date()? {
            summary.first_order = Some(summary.first_order.map_or(date, |d| d.min(date)));
            summary.last_order = Some(summary.last_order.map_or(date, |d| d.max(date)));
        }
        if let Some(state) = record.state {
            states.insert(state);
        }
        if let Some(region) = record.region {
            regions.insert(region);
        }
        summary.rows += 1;
    }

    ensure!(
        summary.rows == expected_rows,
        "Cleaned CSV holds {} rows, expected {}",
        summary.rows,
        expected_rows
    );

    summary.states = states.len();
    summary.regions = regions.len();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::sheet::Cell;

    #[test]
    fn test_writer_quotes_and_escapes() {
        let mut out = Vec::new();
        {
            let mut writer = open_cleaned_writer(&mut out);
            writer
                .write_record([escape_field("say \"hi\""), escape_field("a|b"), String::new()])
                .unwrap();
            writer.flush().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "\"say \\\"hi\\\"\"|\"a|b\"|\"\"\n");
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut sheet = Sheet::new(vec!["Product Name".to_string(), "Note".to_string()]);
        sheet.push_row(vec![
            Cell::Text("12\" \\ shelf".to_string()),
            Cell::Text("pipe | inside".to_string()),
        ]);
        sheet.push_row(vec![Cell::Empty, Cell::Number(4.25)]);

        let file = tempfile::NamedTempFile::new().unwrap();
        let written = write_cleaned_csv(&sheet, file.path()).unwrap();
        assert_eq!(written, 2);

        let back = read_cleaned_csv(file.path()).unwrap();
        assert_eq!(back.headers, sheet.headers);
        assert_eq!(back.len(), sheet.len());
        for (a, b) in sheet.rows.iter().zip(&back.rows) {
            let a: Vec<String> = a.iter().map(Cell::to_field).collect();
            let b: Vec<String> = b.iter().map(Cell::to_field).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_verify_accepts_formatted_amounts() {
        let mut sheet = Sheet::new(
            ["Product Name", "Order Date", "State", "Region", "Product Sub-Category", "Sales", "Profit"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        );
        for (sales, profit) in [("1,234.50", "$20"), ("N/A", ""), ("12", "-3.5")] {
            sheet.push_row(vec![
                Cell::Text("Chair".to_string()),
                Cell::Text("2013-04-01".to_string()),
                Cell::Text("MA".to_string()),
                Cell::Text("East".to_string()),
                Cell::Text("Chairs".to_string()),
                Cell::Text(sales.to_string()),
                Cell::Text(profit.to_string()),
            ]);
        }

        let file = tempfile::NamedTempFile::new().unwrap();
        let written = write_cleaned_csv(&sheet, file.path()).unwrap();
        let summary = verify_cleaned_csv(file.path(), written).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.states, 1);
    }
}

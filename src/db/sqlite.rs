use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::Connection;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::record::{parse_record, ParsedRow};
use super::schema_gen::{generate_create_table, generate_indexes};
use crate::error::SalesError;
use crate::loader::open_cleaned_reader;
use crate::schema::{column_type_for, quote_ident, ColumnInfo, SALES, YEARLY_STATE_SALES_VIEW};
use crate::ui::Ui;

const BATCH_SIZE: usize = 1000;

/// The single database handle a run works through
pub struct SalesDb {
    conn: Connection,
}

impl SalesDb {
    /// Open (or create) the database file
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Fail with [`SalesError::MissingTable`] unless the sales table exists
    pub fn require_sales_table(&self) -> Result<()> {
        if self.table_exists(SALES.name)? {
            Ok(())
        } else {
            Err(SalesError::MissingTable(SALES.name.to_string()).into())
        }
    }

    /// Columns of the sales table, the equivalent of `SHOW COLUMNS`
    pub fn columns(&self) -> Result<Vec<ColumnInfo>> {
        table_columns(&self.conn, SALES.name)
    }

    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(SALES.name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Load a cleaned CSV into the sales table, replacing any earlier copy.
    ///
    /// Known numeric columns are declared REAL, everything else TEXT. The
    /// order date stays text until the transform step changes its type.
    pub fn import_csv(&mut self, csv_path: &Path, ui: &mut impl Ui) -> Result<u64> {
        let total = count_data_lines(csv_path)?;

        let file = File::open(csv_path)
            .with_context(|| format!("Failed to open: {:?}", csv_path))?;
        let mut reader = open_cleaned_reader(BufReader::new(file));

        let headers = unique_column_names(
            reader
                .headers()
                .context("Failed to read CSV header")?
                .iter(),
        );
        for name in SALES.column_names() {
            if !headers.iter().any(|h| h == name) {
                return Err(SalesError::MissingColumn(name.to_string()).into());
            }
        }

        let types: Vec<_> = headers
            .iter()
            .map(|h| column_type_for(h).import_type())
            .collect();
        let columns: Vec<ColumnInfo> = headers
            .iter()
            .zip(&types)
            .map(|(h, t)| ColumnInfo::new(h.as_str(), *t))
            .collect();

        let quoted: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();
        let placeholders: Vec<&str> = headers.iter().map(|_| "?").collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(SALES.name),
            quoted.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;

        tx.execute_batch(&format!(
            "DROP VIEW IF EXISTS {}; DROP TABLE IF EXISTS {};",
            quote_ident(YEARLY_STATE_SALES_VIEW),
            quote_ident(SALES.name)
        ))?;

        let create_sql = generate_create_table(SALES.name, &columns);
        debug!("{}", create_sql);
        tx.execute(&create_sql, [])
            .with_context(|| format!("Failed to create table: {}", SALES.name))?;

        for index_sql in generate_indexes(&SALES, &headers) {
            tx.execute(&index_sql, [])
                .with_context(|| format!("Failed to create index for: {}", SALES.name))?;
        }

        let mut count: u64 = 0;
        let mut batch: Vec<ParsedRow> = Vec::with_capacity(BATCH_SIZE);

        for (i, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Failed to read record in {:?}", csv_path))?;
            // Line 1 is the header
            batch.push(parse_record(&record, &headers, &types, i + 2)?);

            if batch.len() >= BATCH_SIZE {
                insert_batch(&tx, &insert_sql, &batch)?;
                count += batch.len() as u64;
                ui.set_progress(count, total, SALES.name);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            insert_batch(&tx, &insert_sql, &batch)?;
            count += batch.len() as u64;
        }

        tx.commit()?;
        ui.set_progress(count, total, SALES.name);
        ui.clear_progress();
        ui.log(format!("{}: {} records", SALES.name, count));

        Ok(count)
    }

    /// Refresh query planner statistics
    pub fn finalize(self) -> Result<()> {
        self.conn.execute_batch("PRAGMA optimize;")?;
        Ok(())
    }
}

/// Column info for any table; errors when the table does not exist
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                declared_type: row.get(2)?,
                nullable: row.get::<_, i64>(3)? == 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if columns.is_empty() {
        return Err(SalesError::MissingTable(table.to_string()).into());
    }
    Ok(columns)
}

/// Column names safe for `CREATE TABLE`: a blank header becomes
/// `Unnamed: <position>` and a repeated one gets a `.1`, `.2`, ... suffix.
/// SQLite compares identifiers case-insensitively, so this does too.
fn unique_column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::new();

    for (i, header) in headers.enumerate() {
        let base = match header.trim() {
            "" => format!("Unnamed: {}", i),
            _ => header.to_string(),
        };

        let mut name = base.clone();
        let mut n = 1;
        while !seen.insert(name.to_lowercase()) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        if name != header {
            warn!("Column {} '{}' imported as '{}'", i + 1, header, name);
        }
        names.push(name);
    }

    names
}

/// Insert a batch of rows inside an open transaction
fn insert_batch(tx: &rusqlite::Transaction, sql: &str, batch: &[ParsedRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(sql)?;

    for row in batch {
        for (idx, value) in row.values.iter().enumerate() {
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

/// Data records in a cleaned CSV, for progress totals
fn count_data_lines(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Failed to open: {:?}", path))?;
    let mut reader = open_cleaned_reader(BufReader::new(file));
    let mut record = csv::ByteRecord::new();
    let mut count = 0;
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("Failed to read record in {:?}", path))?
    {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::SilentUi;
    use std::io::Write;

    const HEADER: &str = "\"Product Name\"|\"Order Date\"|\"State\"|\"Region\"|\"Product Sub-Category\"|\"Sales\"|\"Profit\"|\"Customer Name\"";

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_import_csv() {
        let csv = write_csv(&[
            "\"Chair\"|\"2012-01-05\"|\"MA\"|\"East\"|\"Chairs\"|\"100.5\"|\"20\"|\"Ann\"",
            "\"Desk\"|\"2013-07-01\"|\"NY\"|\"East\"|\"Tables\"|\"80\"|\"\"|\"Bob\"",
        ]);

        let mut db = SalesDb::open_in_memory().unwrap();
        let count = db.import_csv(csv.path(), &mut SilentUi::new()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.row_count().unwrap(), 2);

        let columns = db.columns().unwrap();
        assert_eq!(columns.len(), 8);
        let date_col = columns.iter().find(|c| c.name == "Order Date").unwrap();
        assert_eq!(date_col.declared_type, "TEXT");
        let profit_col = columns.iter().find(|c| c.name == "Profit").unwrap();
        assert_eq!(profit_col.declared_type, "REAL");

        let null_profit: Option<f64> = db
            .conn()
            .query_row(
                "SELECT Profit FROM sales WHERE \"Product Name\" = 'Desk'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(null_profit, None);
    }

    #[test]
    fn test_import_replaces_existing_table() {
        let csv = write_csv(&["\"Chair\"|\"2012-01-05\"|\"MA\"|\"East\"|\"Chairs\"|\"1\"|\"2\"|\"Ann\""]);
        let mut db = SalesDb::open_in_memory().unwrap();
        db.import_csv(csv.path(), &mut SilentUi::new()).unwrap();
        db.import_csv(csv.path(), &mut SilentUi::new()).unwrap();
        assert_eq!(db.row_count().unwrap(), 1);
    }

    #[test]
    fn test_import_rejects_bad_number() {
        let csv = write_csv(&["\"Chair\"|\"2012-01-05\"|\"MA\"|\"East\"|\"Chairs\"|\"many\"|\"2\"|\"Ann\""]);
        let mut db = SalesDb::open_in_memory().unwrap();
        let err = db.import_csv(csv.path(), &mut SilentUi::new()).unwrap_err();
        assert!(err.to_string().contains("Row 2"));
        assert!(!db.table_exists("sales").unwrap());
    }

    #[test]
    fn test_unique_column_names() {
        let names = unique_column_names(["Sales", "", "Region", "region", "", "Sales", "Sales.1"].into_iter());
        assert_eq!(
            names,
            vec!["Sales", "Unnamed: 1", "Region", "region.1", "Unnamed: 4", "Sales.1", "Sales.1.1"]
        );
    }

    #[test]
    fn test_import_with_blank_and_repeated_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}|\"\"|\"\"|\"State\"", HEADER).unwrap();
        writeln!(
            file,
            "\"Chair\"|\"2012-01-05\"|\"MA\"|\"East\"|\"Chairs\"|\"1\"|\"2\"|\"Ann\"|\"x\"|\"y\"|\"MA2\""
        )
        .unwrap();
        file.flush().unwrap();

        let mut db = SalesDb::open_in_memory().unwrap();
        assert_eq!(db.import_csv(file.path(), &mut SilentUi::new()).unwrap(), 1);

        let names: Vec<String> = db.columns().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(&names[8..], &["Unnamed: 8", "Unnamed: 9", "State.1"]);

        let state: String = db
            .conn()
            .query_row("SELECT State FROM sales", [], |row| row.get(0))
            .unwrap();
        assert_eq!(state, "MA");
    }

    #[test]
    fn test_missing_table() {
        let db = SalesDb::open_in_memory().unwrap();
        assert!(db.require_sales_table().is_err());
        let err = db.columns().unwrap_err();
        assert!(err.downcast_ref::<SalesError>().is_some());
    }
}

use anyhow::{bail, Context, Result};
use log::debug;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeMap;

use super::{YearWindow, ORDER_YEAR_SQL};
use crate::db::{generate_create_table, generate_indexes, table_columns};
use crate::error::SalesError;
use crate::schema::{quote_ident, ColumnType, ORDER_DATE, SALES, STATE, YEARLY_STATE_SALES_VIEW};

/// Abbreviations the sales data uses in place of full state names
pub fn default_state_names() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("MA".to_string(), "Massachusetts".to_string()),
        ("MO".to_string(), "Missouri".to_string()),
    ])
}

/// Change the declared type of the order date column to DATE.
///
/// SQLite cannot alter a column type in place, so the table is rebuilt in a
/// single transaction and the values normalized with `date()`. Returns
/// `false` when the column is already DATE.
pub fn alter_order_date_type(conn: &mut Connection) -> Result<bool> {
    let columns = table_columns(conn, SALES.name)?;
    let current = columns
        .iter()
        .find(|c| c.name == ORDER_DATE)
        .ok_or_else(|| SalesError::MissingColumn(ORDER_DATE.to_string()))?;

    let date_type = ColumnType::Date.sql_type();
    if current.declared_type.eq_ignore_ascii_case(date_type) {
        return Ok(false);
    }

    let date_col = quote_ident(ORDER_DATE);
    let sales = quote_ident(SALES.name);

    let invalid: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {sales}
             WHERE {date_col} IS NOT NULL AND TRIM({date_col}) <> '' AND date({date_col}) IS NULL"
        ),
        [],
        |row| row.get(0),
    )?;
    if invalid > 0 {
        bail!("{} rows hold a '{}' value that is not a date", invalid, ORDER_DATE);
    }

    let rebuilt: Vec<_> = columns
        .iter()
        .map(|c| {
            let mut c = c.clone();
            if c.name == ORDER_DATE {
                c.declared_type = date_type.to_string();
            }
            c
        })
        .collect();
    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let column_list: Vec<String> = names.iter().map(|n| quote_ident(n)).collect();
    let select_list: Vec<String> = names
        .iter()
        .map(|n| {
            if n == ORDER_DATE {
                format!("date({date_col})")
            } else {
                quote_ident(n)
            }
        })
        .collect();

    let staging_name = format!("{}__rebuild", SALES.name);
    let staging = quote_ident(&staging_name);

    let tx = conn.transaction()?;
    // The view reads the old table and would block the rename
    tx.execute_batch(&format!(
        "DROP VIEW IF EXISTS {}; DROP TABLE IF EXISTS {staging};",
        quote_ident(YEARLY_STATE_SALES_VIEW)
    ))?;
    tx.execute(&generate_create_table(&staging_name, &rebuilt), [])?;
    tx.execute(
        &format!(
            "INSERT INTO {staging} ({}) SELECT {} FROM {sales}",
            column_list.join(", "),
            select_list.join(", ")
        ),
        [],
    )?;
    tx.execute(&format!("DROP TABLE {sales}"), [])?;
    tx.execute(&format!("ALTER TABLE {staging} RENAME TO {sales}"), [])?;
    for index_sql in generate_indexes(&SALES, &names) {
        tx.execute(&index_sql, [])?;
    }
    tx.commit().context("Failed to commit order date type change")?;

    Ok(true)
}

/// Replace state abbreviations with full names in one transaction.
/// Returns the number of rows changed.
pub fn substitute_states(conn: &mut Connection, names: &BTreeMap<String, String>) -> Result<usize> {
    if names.is_empty() {
        return Ok(0);
    }

    let state = quote_ident(STATE);
    let mut sql = format!("UPDATE {} SET {state} = CASE", quote_ident(SALES.name));
    let mut params: Vec<&str> = Vec::with_capacity(names.len() * 3);
    for (abbr, full) in names {
        sql.push_str(&format!(" WHEN {state} = ? THEN ?"));
        params.push(abbr);
        params.push(full);
    }
    let in_list = vec!["?"; names.len()].join(", ");
    sql.push_str(&format!(" ELSE {state} END WHERE {state} IN ({in_list})"));
    params.extend(names.keys().map(String::as_str));
    debug!("{}", sql);

    let tx = conn.transaction()?;
    let changed = tx.execute(&sql, params_from_iter(params))?;
    tx.commit().context("Failed to commit state name update")?;

    Ok(changed)
}

/// (Re)create the yearly sales-per-state view over the year window
pub fn create_yearly_view(conn: &Connection, window: YearWindow) -> Result<()> {
    let sql = format!(
        "DROP VIEW IF EXISTS {view};
         CREATE VIEW {view} AS
         SELECT
             {state} AS State,
             {year} AS Order_Year,
             CAST(SUM(\"Sales\") AS REAL) AS Total_Sales
         FROM {sales}
         WHERE {year} BETWEEN {start} AND {end}
         GROUP BY {state}, Order_Year
         ORDER BY {state}, Order_Year;",
        view = quote_ident(YEARLY_STATE_SALES_VIEW),
        state = quote_ident(STATE),
        year = ORDER_YEAR_SQL,
        sales = quote_ident(SALES.name),
        start = window.start,
        end = window.end,
    );
    debug!("{}", sql);
    conn.execute_batch(&sql)
        .with_context(|| format!("Failed to create view: {}", YEARLY_STATE_SALES_VIEW))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SalesDb;

    fn db_with_rows(rows: &[(&str, &str, f64)]) -> SalesDb {
        let db = SalesDb::open_in_memory().unwrap();
        db.conn()
            .execute_batch(
                "CREATE TABLE sales (
                    \"Product Name\" TEXT, \"Order Date\" TEXT, \"State\" TEXT, \"Region\" TEXT,
                    \"Product Sub-Category\" TEXT, \"Sales\" REAL, \"Profit\" REAL)",
            )
            .unwrap();
        for (date, state, sales) in rows {
            db.conn()
                .execute(
                    "INSERT INTO sales VALUES ('p', ?1, ?2, 'East', 'Chairs', ?3, 1.0)",
                    rusqlite::params![date, state, sales],
                )
                .unwrap();
        }
        db
    }

    #[test]
    fn test_alter_order_date_type() {
        let mut db = db_with_rows(&[("2012-01-05 00:00:00", "MA", 1.0), ("", "MO", 2.0)]);
        assert!(alter_order_date_type(db.conn_mut()).unwrap());

        let columns = db.columns().unwrap();
        let date_col = columns.iter().find(|c| c.name == ORDER_DATE).unwrap();
        assert_eq!(date_col.declared_type, "DATE");
        assert_eq!(columns.len(), 7);
        assert_eq!(db.row_count().unwrap(), 2);

        let first: String = db
            .conn()
            .query_row("SELECT \"Order Date\" FROM sales WHERE State = 'MA'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(first, "2012-01-05");

        // Second run is a no-op
        assert!(!alter_order_date_type(db.conn_mut()).unwrap());
    }

    #[test]
    fn test_alter_rejects_invalid_dates() {
        let mut db = db_with_rows(&[("someday", "MA", 1.0)]);
        assert!(alter_order_date_type(db.conn_mut()).is_err());
        let columns = db.columns().unwrap();
        let date_col = columns.iter().find(|c| c.name == ORDER_DATE).unwrap();
        assert_eq!(date_col.declared_type, "TEXT");
    }

    #[test]
    fn test_substitute_states() {
        let mut db = db_with_rows(&[
            ("2012-01-01", "MA", 1.0),
            ("2012-01-01", "MO", 1.0),
            ("2012-01-01", "NY", 1.0),
            ("2012-01-01", "MA", 1.0),
        ]);
        let changed = substitute_states(db.conn_mut(), &default_state_names()).unwrap();
        assert_eq!(changed, 3);

        let mut stmt = db
            .conn()
            .prepare("SELECT State FROM sales ORDER BY rowid")
            .unwrap();
        let states: Vec<String> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(states, vec!["Massachusetts", "Missouri", "NY", "Massachusetts"]);
    }

    #[test]
    fn test_substitute_states_empty_map() {
        let mut db = db_with_rows(&[("2012-01-01", "MA", 1.0)]);
        assert_eq!(substitute_states(db.conn_mut(), &BTreeMap::new()).unwrap(), 0);
    }

    #[test]
    fn test_create_yearly_view_filters_window() {
        let db = db_with_rows(&[
            ("2011-06-01", "NY", 5.0),
            ("2012-06-01", "NY", 10.0),
            ("2012-08-01", "NY", 15.0),
            ("2016-01-01", "NY", 7.0),
        ]);
        create_yearly_view(db.conn(), YearWindow::default()).unwrap();
        create_yearly_view(db.conn(), YearWindow::default()).unwrap();

        let (year, total): (i32, f64) = db
            .conn()
            .query_row("SELECT Order_Year, Total_Sales FROM yearly_state_sales", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(year, 2012);
        assert_eq!(total, 25.0);
    }
}

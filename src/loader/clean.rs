use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::sheet::{Cell, Sheet};
use crate::error::SalesError;
use crate::schema::{ORDER_DATE, PRODUCT_NAME, SALES};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%b %d, %Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Columns the cleaner rewrites
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub text_column: String,
    pub date_column: String,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            text_column: PRODUCT_NAME.to_string(),
            date_column: ORDER_DATE.to_string(),
        }
    }
}

/// What the cleaner changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub rows: usize,
    /// Cells of the text column that lost at least one character
    pub text_cells_changed: usize,
    pub dates_parsed: usize,
    pub dates_empty: usize,
    /// True when at least one date carried a time of day
    pub has_time_of_day: bool,
}

/// Drop every non-ASCII character
pub fn strip_non_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// Parse a cell as a calendar date and time. `Ok(None)` for empty cells.
///
/// Numbers are Excel serial dates. Text tries ISO, US month-first and a few
/// spelled-out layouts.
pub fn parse_order_date(cell: &Cell) -> Result<Option<NaiveDateTime>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Date(d) => Ok(Some(d.and_time(NaiveTime::MIN))),
        Cell::DateTime(dt) => Ok(Some(*dt)),
        Cell::Number(serial) => excel_serial_to_datetime(*serial)
            .map(Some)
            .ok_or_else(|| serial.to_string()),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            parse_date_text(s).map(Some).ok_or_else(|| s.to_string())
        }
        Cell::Bool(b) => Err(b.to_string()),
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    // %Y happily reads "12" as year 12, so pick the year width up front
    if s.contains('/') && !s.contains(' ') {
        let two_digit_year = s.rsplit('/').next().is_some_and(|y| y.len() == 2);
        let fmt = if two_digit_year { "%m/%d/%y" } else { "%m/%d/%Y" };
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

/// Excel stores dates as days since 1899-12-30 with the time as a fraction
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial <= 0.0 || serial >= 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Strip non-ASCII characters from the text column and normalize the date
/// column in place.
///
/// Dates are written as plain dates when none of them carries a time of day,
/// otherwise as date-times. A non-empty date that does not parse fails the
/// whole sheet.
pub fn clean_sheet(sheet: &mut Sheet, options: &CleanOptions) -> Result<CleanReport, SalesError> {
    for name in SALES.column_names() {
        sheet.column_index(name)?;
    }
    let text_idx = sheet.column_index(&options.text_column)?;
    let date_idx = sheet.column_index(&options.date_column)?;

    let mut report = CleanReport {
        rows: sheet.len(),
        ..Default::default()
    };

    let mut parsed = Vec::with_capacity(sheet.len());
    for (i, row) in sheet.rows.iter_mut().enumerate() {
        let cleaned = match &row[text_idx] {
            Cell::Empty => Cell::Empty,
            Cell::Text(s) => {
                let stripped = strip_non_ascii(s);
                if stripped.len() != s.len() {
                    report.text_cells_changed += 1;
                }
                Cell::Text(stripped)
            }
            other => Cell::Text(other.to_field()),
        };
        row[text_idx] = cleaned;

        // Row numbers count the header as row 1
        let date = parse_order_date(&row[date_idx]).map_err(|value| SalesError::InvalidDate {
            row: i + 2,
            column: options.date_column.clone(),
            value,
        })?;
        match date {
            Some(dt) => {
                report.dates_parsed += 1;
                if dt.time() != NaiveTime::MIN {
                    report.has_time_of_day = true;
                }
            }
            None => report.dates_empty += 1,
        }
        parsed.push(date);
    }

    for (row, date) in sheet.rows.iter_mut().zip(parsed) {
        row[date_idx] = match date {
            None => Cell::Empty,
            Some(dt) if report.has_time_of_day => Cell::DateTime(dt),
            Some(dt) => Cell::Date(dt.date()),
        };
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn sales_sheet(rows: Vec<Vec<Cell>>) -> Sheet {
        let mut sheet = Sheet::new(
            SALES
                .column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for row in rows {
            sheet.push_row(row);
        }
        sheet
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_strip_non_ascii() {
        assert_eq!(strip_non_ascii("Café Chair™"), "Caf Chair");
        assert_eq!(strip_non_ascii("plain"), "plain");
        assert_eq!(strip_non_ascii("日本"), "");
    }

    #[test]
    fn test_parse_date_layouts() {
        let expected = Some(date(2012, 1, 5));
        assert_eq!(parse_order_date(&text("2012-01-05")).unwrap(), expected);
        assert_eq!(parse_order_date(&text("1/5/2012")).unwrap(), expected);
        assert_eq!(parse_order_date(&text("01/05/12")).unwrap(), expected);
        assert_eq!(parse_order_date(&text("2012/01/05")).unwrap(), expected);
        assert_eq!(
            parse_order_date(&text("2012-01-05 00:00:00")).unwrap(),
            expected
        );
        assert_eq!(parse_order_date(&Cell::Empty).unwrap(), None);
        assert_eq!(parse_order_date(&text("   ")).unwrap(), None);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_order_date(&text("soon")), Err("soon".to_string()));
        assert!(parse_order_date(&text("2012-13-40")).is_err());
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(excel_serial_to_datetime(40909.0), Some(date(2012, 1, 1)));
        let noon = excel_serial_to_datetime(40909.5).unwrap();
        assert_eq!(noon.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(excel_serial_to_datetime(-1.0), None);
    }

    #[test]
    fn test_clean_sheet() {
        let mut sheet = sales_sheet(vec![
            vec![
                text("Bush Somerset Collection Bookcase – Fully Assembled"),
                text("3/14/2013"),
                text("MA"),
                text("East"),
                text("Bookcases"),
                text("261.96"),
                text("41.91"),
            ],
            vec![
                Cell::Empty,
                Cell::Empty,
                text("MO"),
                text("Central"),
                text("Chairs"),
                text("10"),
                text("-2"),
            ],
            vec![
                Cell::Number(42.0),
                Cell::Number(41275.0),
                text("NY"),
                text("East"),
                text("Tables"),
                text("5"),
                text("1"),
            ],
        ]);

        let report = clean_sheet(&mut sheet, &CleanOptions::default()).unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.text_cells_changed, 1);
        assert_eq!(report.dates_parsed, 2);
        assert_eq!(report.dates_empty, 1);
        assert!(!report.has_time_of_day);

        assert_eq!(
            sheet.rows[0][0],
            text("Bush Somerset Collection Bookcase  Fully Assembled")
        );
        assert_eq!(
            sheet.rows[0][1],
            Cell::Date(NaiveDate::from_ymd_opt(2013, 3, 14).unwrap())
        );
        assert_eq!(sheet.rows[1][0], Cell::Empty);
        assert_eq!(sheet.rows[1][1], Cell::Empty);
        assert_eq!(sheet.rows[2][0], text("42"));
        assert_eq!(
            sheet.rows[2][1],
            Cell::Date(NaiveDate::from_ymd_opt(2013, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_clean_sheet_keeps_time_when_present() {
        let mut sheet = sales_sheet(vec![
            vec![text("A"), text("2012-01-01 08:30:00")],
            vec![text("B"), text("2012-01-02")],
        ]);
        clean_sheet(&mut sheet, &CleanOptions::default()).unwrap();
        assert_eq!(sheet.rows[0][1].to_field(), "2012-01-01 08:30:00");
        assert_eq!(sheet.rows[1][1].to_field(), "2012-01-02 00:00:00");
    }

    #[test]
    fn test_clean_sheet_bad_date_names_row() {
        let mut sheet = sales_sheet(vec![
            vec![text("A"), text("2012-01-01")],
            vec![text("B"), text("not a date")],
        ]);
        let err = clean_sheet(&mut sheet, &CleanOptions::default()).unwrap_err();
        match err {
            SalesError::InvalidDate { row, value, .. } => {
                assert_eq!(row, 3);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_clean_sheet_missing_column() {
        let mut sheet = Sheet::new(vec!["Product Name".to_string()]);
        let err = clean_sheet(&mut sheet, &CleanOptions::default()).unwrap_err();
        assert!(matches!(err, SalesError::MissingColumn(_)));
    }
}

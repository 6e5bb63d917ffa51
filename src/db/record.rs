use crate::error::SalesError;
use crate::schema::ColumnType;

/// A parsed row ready for insertion, one value per table column
pub struct ParsedRow {
    pub values: Vec<SqlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

/// Parse a cleaned CSV record into typed values for the given columns.
/// `row` is the 1-based line number used in error messages.
pub fn parse_record(
    record: &csv::StringRecord,
    headers: &[String],
    types: &[ColumnType],
    row: usize,
) -> Result<ParsedRow, SalesError> {
    let values = record
        .iter()
        .zip(headers.iter().zip(types))
        .map(|(field, (name, col_type))| {
            extract_value(field, col_type).ok_or_else(|| SalesError::InvalidNumber {
                row,
                column: name.clone(),
                value: field.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedRow { values })
}

/// `None` when a numeric field does not parse
fn extract_value(field: &str, col_type: &ColumnType) -> Option<SqlValue> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Some(SqlValue::Null);
    }

    match col_type {
        ColumnType::Real => parse_real(trimmed).map(SqlValue::Real),
        ColumnType::Text | ColumnType::Date => Some(SqlValue::Text(field.to_string())),
    }
}

/// Accepts spreadsheet-style amounts such as "1,234.50" and "$12"
fn parse_real(s: &str) -> Option<f64> {
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    let stripped: String = s.chars().filter(|c| *c != ',' && *c != '$').collect();
    stripped.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_value() {
        assert_eq!(extract_value("", &ColumnType::Real), Some(SqlValue::Null));
        assert_eq!(
            extract_value("12.5", &ColumnType::Real),
            Some(SqlValue::Real(12.5))
        );
        assert_eq!(
            extract_value("1,234.50", &ColumnType::Real),
            Some(SqlValue::Real(1234.5))
        );
        assert_eq!(extract_value("abc", &ColumnType::Real), None);
        assert_eq!(
            extract_value(" MA", &ColumnType::Text),
            Some(SqlValue::Text(" MA".to_string()))
        );
    }

    #[test]
    fn test_parse_record_reports_row_and_column() {
        let record = csv::StringRecord::from(vec!["Chair", "lots"]);
        let headers = vec!["Product Name".to_string(), "Profit".to_string()];
        let types = vec![ColumnType::Text, ColumnType::Real];

        let err = parse_record(&record, &headers, &types, 4)
            .err()
            .expect("expected a parse error");
        match err {
            SalesError::InvalidNumber { row, column, value } => {
                assert_eq!(row, 4);
                assert_eq!(column, "Profit");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

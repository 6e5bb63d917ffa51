use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// One sales line as found in the cleaned CSV. Columns beyond these seven
/// are ignored when decoding.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SalesRecord {
    #[serde(rename = "Product Name")]
    pub product_name: Option<String>,
    #[serde(rename = "Order Date")]
    pub order_date: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "Product Sub-Category")]
    pub sub_category: Option<String>,
    /// Amounts stay as written ("1,234.50", "$20"); the importer parses them
    #[serde(rename = "Sales")]
    pub sales: Option<String>,
    #[serde(rename = "Profit")]
    pub profit: Option<String>,
}

impl SalesRecord {
    /// Calendar date of the order. Date-time values keep only the date part.
    pub fn order_date(&self) -> Result<Option<NaiveDate>> {
        let Some(raw) = self.order_date.as_deref() else {
            return Ok(None);
        };
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map(Some)
            .with_context(|| format!("Invalid order date '{}'", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: Option<&str>) -> SalesRecord {
        SalesRecord {
            product_name: Some("Chair".into()),
            order_date: date.map(str::to_string),
            state: None,
            region: None,
            sub_category: None,
            sales: None,
            profit: None,
        }
    }

    #[test]
    fn test_order_date() {
        let d = NaiveDate::from_ymd_opt(2014, 6, 30).unwrap();
        assert_eq!(record(Some("2014-06-30")).order_date().unwrap(), Some(d));
        assert_eq!(
            record(Some("2014-06-30 13:00:00")).order_date().unwrap(),
            Some(d)
        );
        assert_eq!(record(None).order_date().unwrap(), None);
        assert!(record(Some("June")).order_date().is_err());
    }
}

use anyhow::{Context, Result};
use log::debug;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::{YearWindow, ORDER_YEAR_SQL};
use crate::schema::{quote_ident, SALES, YEARLY_STATE_SALES_VIEW};

/// Order lines per year, over every year present
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyLineItems {
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "Order_Line_Items")]
    pub line_items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRateRow {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Order_Year")]
    pub order_year: i32,
    #[serde(rename = "Total_Sales")]
    pub total_sales: f64,
    /// `None` for a state's first year in the window
    #[serde(rename = "Previous_Year_Sales")]
    pub previous_year_sales: Option<f64>,
    #[serde(rename = "Growth_Rate_Pct")]
    pub growth_rate_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitRow {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Sub_Category")]
    pub sub_category: String,
    #[serde(rename = "Total_Profit")]
    pub total_profit: f64,
    #[serde(rename = "Order_Count")]
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProductRow {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Sub_Category")]
    pub sub_category: String,
    #[serde(rename = "Total_Profit")]
    pub total_profit: f64,
}

fn text(row: &Row, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn query_rows<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    map: impl FnMut(&Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    debug!("{}", sql);
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn yearly_line_items(conn: &Connection) -> Result<Vec<YearlyLineItems>> {
    let sql = format!(
        "SELECT {ORDER_YEAR_SQL} AS Year, COUNT(*) AS Order_Line_Items
         FROM {}
         GROUP BY Year
         ORDER BY Year",
        quote_ident(SALES.name)
    );
    query_rows(conn, &sql, [], |row| {
        Ok(YearlyLineItems {
            year: row.get(0)?,
            line_items: row.get::<_, i64>(1)? as u64,
        })
    })
    .context("Failed to count order lines per year")
}

/// Year-over-year sales growth per state, read from the yearly view.
///
/// The previous value is the state's previous row ordered by year, so a gap
/// year compares against the last year that had sales.
pub fn growth_rates(conn: &Connection) -> Result<Vec<GrowthRateRow>> {
    let sql = format!(
        "WITH yearly_data AS (
             SELECT * FROM {}
         )
         SELECT
             State,
             Order_Year,
             Total_Sales,
             LAG(Total_Sales) OVER w AS Previous_Year_Sales,
             ROUND(
                 (Total_Sales - LAG(Total_Sales) OVER w) * 100.0 / LAG(Total_Sales) OVER w,
             2) AS Growth_Rate_Pct
         FROM yearly_data
         WINDOW w AS (PARTITION BY State ORDER BY Order_Year)
         ORDER BY State, Order_Year",
        quote_ident(YEARLY_STATE_SALES_VIEW)
    );
    query_rows(conn, &sql, [], |row| {
        Ok(GrowthRateRow {
            state: text(row, 0)?,
            order_year: row.get(1)?,
            total_sales: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
            previous_year_sales: row.get(3)?,
            growth_rate_pct: row.get(4)?,
        })
    })
    .context("Failed to compute sales growth rates")
}

/// Total profit and order count per region and sub-category, most
/// profitable first within each region
pub fn profit_by_subcategory(conn: &Connection, window: YearWindow) -> Result<Vec<ProfitRow>> {
    let sql = format!(
        "SELECT
             \"Region\" AS Region,
             \"Product Sub-Category\" AS Sub_Category,
             COALESCE(SUM(\"Profit\"), 0) AS Total_Profit,
             COUNT(*) AS Order_Count
         FROM {}
         WHERE {ORDER_YEAR_SQL} BETWEEN ?1 AND ?2
         GROUP BY \"Region\", \"Product Sub-Category\"
         ORDER BY Region, Total_Profit DESC, Sub_Category",
        quote_ident(SALES.name)
    );
    query_rows(conn, &sql, params![window.start, window.end], |row| {
        Ok(ProfitRow {
            region: text(row, 0)?,
            sub_category: text(row, 1)?,
            total_profit: row.get(2)?,
            order_count: row.get::<_, i64>(3)? as u64,
        })
    })
    .context("Failed to compute profit by sub-category")
}

/// The most profitable sub-category of every region, one row per region.
/// Ties on profit go to the alphabetically first sub-category.
pub fn top_product_per_region(conn: &Connection, window: YearWindow) -> Result<Vec<TopProductRow>> {
    let sql = format!(
        "WITH ranked_products AS (
             SELECT
                 \"Region\" AS Region,
                 \"Product Sub-Category\" AS Sub_Category,
                 COALESCE(SUM(\"Profit\"), 0) AS Total_Profit,
                 ROW_NUMBER() OVER (
                     PARTITION BY \"Region\"
                     ORDER BY COALESCE(SUM(\"Profit\"), 0) DESC, \"Product Sub-Category\"
                 ) AS rank_num
             FROM {}
             WHERE {ORDER_YEAR_SQL} BETWEEN ?1 AND ?2
             GROUP BY \"Region\", \"Product Sub-Category\"
         )
         SELECT Region, Sub_Category, Total_Profit
         FROM ranked_products
         WHERE rank_num = 1
         ORDER BY Total_Profit DESC, Region",
        quote_ident(SALES.name)
    );
    query_rows(conn, &sql, params![window.start, window.end], |row| {
        Ok(TopProductRow {
            region: text(row, 0)?,
            sub_category: text(row, 1)?,
            total_profit: row.get(2)?,
        })
    })
    .context("Failed to rank sub-categories per region")
}

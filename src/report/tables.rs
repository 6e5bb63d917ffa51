use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::query::{GrowthRateRow, ProfitRow, TopProductRow, YearlyLineItems};
use crate::schema::ColumnInfo;
use crate::ui::ResultTable;

/// Rows of the profit table shown on the console
pub const PROFIT_PREVIEW_ROWS: usize = 5;

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

fn optional(v: Option<f64>) -> String {
    v.map(money).unwrap_or_else(|| "NULL".to_string())
}

fn header(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn columns_table(columns: &[ColumnInfo]) -> ResultTable {
    ResultTable {
        title: "Columns of sales".to_string(),
        header: header(&["Field", "Type", "Null"]),
        rows: columns
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.declared_type.clone(),
                    if c.nullable { "YES" } else { "NO" }.to_string(),
                ]
            })
            .collect(),
    }
}

pub fn line_items_table(rows: &[YearlyLineItems]) -> ResultTable {
    ResultTable {
        title: "Order line items per year".to_string(),
        header: header(&["Year", "Order_Line_Items"]),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.year.map(|y| y.to_string()).unwrap_or_else(|| "NULL".to_string()),
                    r.line_items.to_string(),
                ]
            })
            .collect(),
    }
}

pub fn growth_table(rows: &[GrowthRateRow]) -> ResultTable {
    ResultTable {
        title: "Sales growth rate by state".to_string(),
        header: header(&GROWTH_HEADER),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.state.clone(),
                    r.order_year.to_string(),
                    money(r.total_sales),
                    optional(r.previous_year_sales),
                    optional(r.growth_rate_pct),
                ]
            })
            .collect(),
    }
}

/// Only the first rows, the way a dataframe preview would
pub fn profit_table(rows: &[ProfitRow]) -> ResultTable {
    ResultTable {
        title: "Profit by Sub-Category and Region".to_string(),
        header: header(&PROFIT_HEADER),
        rows: rows
            .iter()
            .take(PROFIT_PREVIEW_ROWS)
            .map(|r| {
                vec![
                    r.region.clone(),
                    r.sub_category.clone(),
                    money(r.total_profit),
                    r.order_count.to_string(),
                ]
            })
            .collect(),
    }
}

pub fn top_products_table(rows: &[TopProductRow]) -> ResultTable {
    ResultTable {
        title: "Top Products by Region".to_string(),
        header: header(&TOP_PRODUCT_HEADER),
        rows: rows
            .iter()
            .map(|r| vec![r.region.clone(), r.sub_category.clone(), money(r.total_profit)])
            .collect(),
    }
}

/// The `n` most profitable sub-categories of every region, regions in
/// alphabetical order, each region's rows by descending profit
pub fn top_n_per_region(rows: &[ProfitRow], n: usize) -> Vec<ProfitRow> {
    let mut by_region: BTreeMap<&str, Vec<&ProfitRow>> = BTreeMap::new();
    for row in rows {
        by_region.entry(row.region.as_str()).or_default().push(row);
    }

    by_region
        .into_values()
        .flat_map(|mut group| {
            group.sort_by(|a, b| b.total_profit.total_cmp(&a.total_profit));
            group.into_iter().take(n).cloned()
        })
        .collect()
}

const GROWTH_HEADER: [&str; 5] = [
    "State",
    "Order_Year",
    "Total_Sales",
    "Previous_Year_Sales",
    "Growth_Rate_Pct",
];
const PROFIT_HEADER: [&str; 4] = ["Region", "Sub_Category", "Total_Profit", "Order_Count"];
const TOP_PRODUCT_HEADER: [&str; 3] = ["Region", "Sub_Category", "Total_Profit"];

/// `header` is only written by hand for an empty result; otherwise serde
/// derives it from the first row
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create: {:?}", path))?;
    if rows.is_empty() {
        writer
            .write_record(header)
            .with_context(|| format!("Failed to write header to {:?}", path))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {:?}", path))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the three result sets as comma-separated files into `dir`
pub fn export_results(
    dir: &Path,
    growth: &[GrowthRateRow],
    profit: &[ProfitRow],
    top: &[TopProductRow],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let growth_path = dir.join("growth_rates.csv");
    let profit_path = dir.join("profit_by_subcategory.csv");
    let top_path = dir.join("top_products.csv");

    write_rows(&growth_path, &GROWTH_HEADER, growth)?;
    write_rows(&profit_path, &PROFIT_HEADER, profit)?;
    write_rows(&top_path, &TOP_PRODUCT_HEADER, top)?;

    Ok(vec![growth_path, profit_path, top_path])
}

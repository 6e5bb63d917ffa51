//! Table and column names shared by the cleaner, the loader and the queries

use super::types::{Column, ColumnType, Index, TableSchema};

pub const PRODUCT_NAME: &str = "Product Name";
pub const ORDER_DATE: &str = "Order Date";
pub const STATE: &str = "State";
pub const REGION: &str = "Region";
pub const SUB_CATEGORY: &str = "Product Sub-Category";
pub const SALES_AMOUNT: &str = "Sales";
pub const PROFIT: &str = "Profit";

/// Aggregation view over the year window
pub const YEARLY_STATE_SALES_VIEW: &str = "yearly_state_sales";

pub static SALES: TableSchema = TableSchema {
    name: "sales",
    columns: &[
        Column::new(PRODUCT_NAME, ColumnType::Text),
        Column::new(ORDER_DATE, ColumnType::Date),
        Column::new(STATE, ColumnType::Text),
        Column::new(REGION, ColumnType::Text),
        Column::new(SUB_CATEGORY, ColumnType::Text),
        Column::new(SALES_AMOUNT, ColumnType::Real),
        Column::new(PROFIT, ColumnType::Real),
    ],
    indexes: &[
        Index::on(&[STATE]),
        Index::on(&[REGION, SUB_CATEGORY]),
        Index::on(&[ORDER_DATE]),
    ],
};

/// Declared type for an input column: known sales columns keep their type,
/// anything else is text.
pub fn column_type_for(name: &str) -> ColumnType {
    SALES
        .column(name)
        .map(|c| c.col_type)
        .unwrap_or(ColumnType::Text)
}

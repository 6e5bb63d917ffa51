use crate::schema::{quote_ident, ColumnInfo, TableSchema};

/// Generate CREATE TABLE SQL for a list of columns
pub fn generate_create_table(table: &str, columns: &[ColumnInfo]) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", quote_ident(table));

    let defs: Vec<String> = columns
        .iter()
        .map(|col| {
            let null_constraint = if !col.nullable { " NOT NULL" } else { "" };
            format!(
                "    {} {}{}",
                quote_ident(&col.name),
                col.declared_type,
                null_constraint
            )
        })
        .collect();

    sql.push_str(&defs.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate CREATE INDEX statements for the schema's indexes whose columns
/// all exist in `present`
pub fn generate_indexes(schema: &TableSchema, present: &[String]) -> Vec<String> {
    schema
        .indexes
        .iter()
        .filter(|idx| {
            idx.columns
                .iter()
                .all(|c| present.iter().any(|p| p == c))
        })
        .map(|idx| {
            let suffix: Vec<String> = idx.columns.iter().map(|c| index_suffix(c)).collect();
            let cols: Vec<String> = idx.columns.iter().map(|c| quote_ident(c)).collect();
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                schema.name,
                suffix.join("_"),
                quote_ident(schema.name),
                cols.join(", ")
            )
        })
        .collect()
}

/// "Product Sub-Category" -> "product_sub_category"
fn index_suffix(column: &str) -> String {
    column
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, SALES};

    #[test]
    fn test_generate_create_table() {
        let columns = vec![
            ColumnInfo::new("Order Date", ColumnType::Date),
            ColumnInfo::new("Profit", ColumnType::Real),
        ];
        let sql = generate_create_table("sales", &columns);
        assert!(sql.contains("CREATE TABLE \"sales\""));
        assert!(sql.contains("\"Order Date\" DATE"));
        assert!(sql.contains("\"Profit\" REAL"));
        assert!(!sql.contains("NOT NULL"));
    }

    #[test]
    fn test_generate_indexes() {
        let present: Vec<String> = SALES.column_names().iter().map(|s| s.to_string()).collect();
        let indexes = generate_indexes(&SALES, &present);
        assert_eq!(indexes.len(), 3);
        assert!(indexes
            .iter()
            .any(|i| i.contains("idx_sales_region_product_sub_category")));

        let indexes = generate_indexes(&SALES, &["State".to_string()]);
        assert_eq!(indexes.len(), 1);
    }
}

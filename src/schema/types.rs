/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Real,
    Text,
    /// Calendar date, stored by SQLite as `YYYY-MM-DD` text
    Date,
}

impl ColumnType {
    /// SQL type name used in `CREATE TABLE`
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
        }
    }

    /// Type a generic CSV import declares for this column. Dates arrive as
    /// text and are converted afterwards by the transform step.
    pub fn import_type(&self) -> ColumnType {
        match self {
            ColumnType::Date => ColumnType::Text,
            other => *other,
        }
    }
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self { name, col_type }
    }
}

/// Index definition
#[derive(Debug, Clone)]
pub struct Index {
    pub columns: &'static [&'static str],
}

impl Index {
    pub const fn on(columns: &'static [&'static str]) -> Self {
        Self { columns }
    }
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    /// Columns every input must carry. Extra input columns are kept as text.
    pub columns: &'static [Column],
    pub indexes: &'static [Index],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the columns every input must carry
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

/// A column as it exists in the database, from `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            declared_type: col_type.sql_type().to_string(),
            nullable: true,
        }
    }
}

/// Quote an identifier for SQLite. Sales columns carry spaces and dashes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

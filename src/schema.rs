//! Runtime table definitions and identifier handling.
//!
//! Column clauses are opaque to the store and handed to SQLite verbatim.
//! Table and column names are validated and double-quoted before they are
//! interpolated into any statement.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Check that `name` is a plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate and quote an identifier for interpolation.
pub fn quote_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

/// One column: its name and the type/constraint clause that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub clause: String,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, clause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clause: clause.into(),
        }
    }
}

/// Ordered column list for `create_table`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Columns {
    pub columns: Vec<ColumnDefinition>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn with_column(mut self, name: impl Into<String>, clause: impl Into<String>) -> Self {
        self.columns.push(ColumnDefinition::new(name, clause));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDefinition> {
        self.columns.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Columns {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(name, clause)| ColumnDefinition::new(name, clause))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Columns {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// A named table and its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Columns,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Columns::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, clause: impl Into<String>) -> Self {
        self.columns = self.columns.with_column(name, clause);
        self
    }
}

/// Tables to create when a store is opened.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }
}

/// `CREATE TABLE IF NOT EXISTS` for `name` with `columns` in order.
pub(crate) fn create_table_sql(name: &str, columns: &Columns) -> Result<String> {
    let table = quote_identifier(name)?;
    if columns.is_empty() {
        return Err(StoreError::EmptyColumns(name.to_string()));
    }
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns.iter() {
        let quoted = quote_identifier(&column.name)?;
        let clause = column.clause.trim();
        if clause.is_empty() {
            parts.push(quoted);
        } else {
            parts.push(format!("{quoted} {clause}"));
        }
    }
    Ok(format!("CREATE TABLE IF NOT EXISTS {table} ({})", parts.join(", ")))
}

pub(crate) fn drop_table_sql(name: &str) -> Result<String> {
    Ok(format!("DROP TABLE IF EXISTS {}", quote_identifier(name)?))
}

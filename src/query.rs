use std::ops::Index;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Result, StoreError};
use crate::schema::quote_identifier;
use crate::value::Value;

/// Ordered column → value mapping. Used for inserts and for selected rows.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value for the same column
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(column, _)| column == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(column, _)| column.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Index<usize> for Record {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.fields[index].1
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            let name: String = name.into();
            record.set(&name, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Equality filter: every condition must match (AND).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Criteria {
    conditions: Vec<(String, Value)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((field.to_string(), value.into()));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|(field, _)| field.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Parsed `ORDER BY` column list, e.g. `"date_added"` or `"title, id DESC"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    terms: Vec<(String, Direction)>,
}

impl OrderBy {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || StoreError::InvalidOrderBy(input.to_string());
        let mut terms = Vec::new();
        for term in input.split(',') {
            let mut words = term.split_whitespace();
            let column = words.next().ok_or_else(invalid)?;
            let direction = match words.next() {
                None => Direction::Ascending,
                Some(word) if word.eq_ignore_ascii_case("asc") => Direction::Ascending,
                Some(word) if word.eq_ignore_ascii_case("desc") => Direction::Descending,
                Some(_) => return Err(invalid()),
            };
            if words.next().is_some() {
                return Err(invalid());
            }
            quote_identifier(column).map_err(|_| invalid())?;
            terms.push((column.to_string(), direction));
        }
        Ok(Self { terms })
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(column, _)| column.as_str())
    }

    fn to_sql(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.terms.len());
        for (column, direction) in &self.terms {
            let keyword = match direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            parts.push(format!("{} {keyword}", quote_identifier(column)?));
        }
        Ok(parts.join(", "))
    }
}

/// SQL statement with positional parameters bound as `?1`, `?2`, ...
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Vec<Value>,
}

impl SqlQuery {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: &Value) -> String {
        self.params.push(value.clone());
        format!("?{}", self.params.len())
    }

    fn push_where(&mut self, criteria: Option<&Criteria>) -> Result<()> {
        let Some(criteria) = criteria.filter(|criteria| !criteria.is_empty()) else {
            return Ok(());
        };
        let mut parts = Vec::with_capacity(criteria.conditions.len());
        for (field, value) in &criteria.conditions {
            let column = quote_identifier(field)?;
            let placeholder = self.bind(value);
            parts.push(format!("{column} = {placeholder}"));
        }
        self.statement.push_str(" WHERE ");
        self.statement.push_str(&parts.join(" AND "));
        Ok(())
    }
}

pub(crate) fn insert_query(table: &str, record: &Record) -> Result<SqlQuery> {
    let table_name = quote_identifier(table)?;
    if record.is_empty() {
        return Err(StoreError::EmptyRecord(table.to_string()));
    }
    let mut query = SqlQuery::new(String::new());
    let mut columns = Vec::with_capacity(record.len());
    let mut placeholders = Vec::with_capacity(record.len());
    for (column, value) in record.iter() {
        columns.push(quote_identifier(column)?);
        placeholders.push(query.bind(value));
    }
    query.statement = format!(
        "INSERT INTO {table_name} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(query)
}

pub(crate) fn delete_query(table: &str, criteria: &Criteria) -> Result<SqlQuery> {
    let mut query = SqlQuery::new(format!("DELETE FROM {}", quote_identifier(table)?));
    query.push_where(Some(criteria))?;
    Ok(query)
}

pub(crate) fn select_query(
    table: &str,
    criteria: Option<&Criteria>,
    order_by: Option<&OrderBy>,
) -> Result<SqlQuery> {
    let mut query = SqlQuery::new(format!("SELECT * FROM {}", quote_identifier(table)?));
    query.push_where(criteria)?;
    if let Some(order_by) = order_by {
        query.statement.push_str(" ORDER BY ");
        query.statement.push_str(&order_by.to_sql()?);
    }
    Ok(query)
}

pub(crate) fn count_query(table: &str, criteria: Option<&Criteria>) -> Result<SqlQuery> {
    let mut query = SqlQuery::new(format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?));
    query.push_where(criteria)?;
    Ok(query)
}

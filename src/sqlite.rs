use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{params_from_iter, Connection, Row, Rows, Statement, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::query::{count_query, delete_query, insert_query, select_query};
use crate::query::{Criteria, OrderBy, Record, SqlQuery};
use crate::schema::{create_table_sql, drop_table_sql, Columns, Schema};
use crate::value::Value;

/// Table store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Tables created when the store opens
    #[serde(default)]
    pub schema: Schema,
}

impl StoreConfig {
    /// Create a new config with path and schema
    pub fn new(db_path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            db_path: db_path.into(),
            schema,
        }
    }
}

/// Table operations shared by [`TableStore`] and [`StoreTransaction`].
///
/// Every call issues a single statement. Outside a transaction each call
/// commits on its own.
pub trait TableOps {
    /// The connection statements run on.
    fn connection(&self) -> Result<&Connection>;

    /// Create `name` unless it already exists.
    ///
    /// An existing table with a different column list is a
    /// [`StoreError::SchemaConflict`]; clauses are not compared.
    fn create_table(&self, name: &str, columns: &Columns) -> Result<()> {
        let conn = self.connection()?;
        let sql = create_table_sql(name, columns)?;
        let existing = table_columns(conn, name)?;
        if !existing.is_empty() && !same_columns(&existing, columns) {
            return Err(StoreError::SchemaConflict {
                table: name.to_string(),
                existing: existing.join(", "),
                requested: columns.names().collect::<Vec<_>>().join(", "),
            });
        }
        execute(conn, &SqlQuery::new(sql))?;
        Ok(())
    }

    /// Drop `name` if it exists.
    fn drop_table(&self, name: &str) -> Result<()> {
        let conn = self.connection()?;
        execute(conn, &SqlQuery::new(drop_table_sql(name)?))?;
        Ok(())
    }

    /// Insert `record` and return the new row id.
    fn add(&self, table: &str, record: &Record) -> Result<i64> {
        let conn = self.connection()?;
        execute(conn, &insert_query(table, record)?)?;
        Ok(conn.last_insert_rowid())
    }

    /// Delete rows matching `criteria`; empty criteria deletes every row.
    fn delete(&self, table: &str, criteria: &Criteria) -> Result<usize> {
        let conn = self.connection()?;
        let query = delete_query(table, criteria)?;
        check_columns(conn, table, criteria.fields())?;
        execute(conn, &query)
    }

    /// Prepare `SELECT *` over `table`. Nothing is read until a cursor is
    /// opened on the returned selection.
    fn select(
        &self,
        table: &str,
        criteria: Option<&Criteria>,
        order_by: Option<&str>,
    ) -> Result<Selection<'_>> {
        let conn = self.connection()?;
        let order_by = order_by.map(OrderBy::parse).transpose()?;
        let query = select_query(table, criteria, order_by.as_ref())?;
        let criteria_fields = criteria.into_iter().flat_map(Criteria::fields);
        let order_fields = order_by.iter().flat_map(OrderBy::columns);
        check_columns(conn, table, criteria_fields.chain(order_fields))?;
        debug!(statement = %query.statement, params = query.params.len(), "prepare");
        let statement = conn.prepare(&query.statement)?;
        Ok(Selection::new(statement, query.params))
    }

    /// Number of rows matching `criteria`.
    fn count(&self, table: &str, criteria: Option<&Criteria>) -> Result<u64> {
        let conn = self.connection()?;
        let query = count_query(table, criteria)?;
        check_columns(conn, table, criteria.into_iter().flat_map(Criteria::fields))?;
        debug!(statement = %query.statement, params = query.params.len(), "query");
        let count: i64 = conn.query_row(
            &query.statement,
            params_from_iter(query.params.iter()),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            "SELECT count(name) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Column names of `name` in declaration order; empty if no such table.
    fn columns(&self, name: &str) -> Result<Vec<String>> {
        table_columns(self.connection()?, name)
    }
}

/// Handle owning the single connection to one database file.
pub struct TableStore {
    path: PathBuf,
    connection: Option<Connection>,
}

impl TableStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(StoreConfig::new(path.as_ref(), Schema::new()))
    }

    /// Open the configured database and create its schema tables.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        let StoreConfig { db_path, schema } = config;
        info!(path = %db_path.display(), "opening table store");
        let unavailable = |source| StoreError::StorageUnavailable {
            path: db_path.clone(),
            source,
        };
        let connection = Connection::open(&db_path).map_err(unavailable)?;
        // Reads the file header, so a non-database file fails here.
        connection
            .query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(unavailable)?;

        let store = Self {
            path: db_path,
            connection: Some(connection),
        };
        for table in &schema.tables {
            store.create_table(&table.name, &table.columns)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Close the connection. Calling it again is a no-op.
    ///
    /// If SQLite refuses to close, the connection stays open and
    /// [`StoreError::ResourceBusy`] is returned.
    pub fn close(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        match connection.close() {
            Ok(()) => {
                info!(path = %self.path.display(), "closed table store");
                Ok(())
            }
            Err((connection, err)) => {
                warn!(path = %self.path.display(), error = %err, "table store refused to close");
                self.connection = Some(connection);
                Err(StoreError::ResourceBusy(err))
            }
        }
    }

    /// Run `f` inside one transaction: committed if `f` returns `Ok`,
    /// rolled back otherwise.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&StoreTransaction<'_>) -> Result<T>,
    {
        let connection = self.connection.as_mut().ok_or(StoreError::Closed)?;
        debug!("begin transaction");
        let scope = StoreTransaction {
            tx: connection.transaction()?,
        };
        let value = f(&scope)?;
        scope.tx.commit()?;
        debug!("commit transaction");
        Ok(value)
    }
}

impl TableOps for TableStore {
    fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(StoreError::Closed)
    }
}

impl Drop for TableStore {
    fn drop(&mut self) {
        if self.connection.is_some() {
            debug!(path = %self.path.display(), "releasing table store");
        }
    }
}

/// Table operations grouped into one transaction; see [`TableStore::transaction`].
pub struct StoreTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl TableOps for StoreTransaction<'_> {
    fn connection(&self) -> Result<&Connection> {
        Ok(&*self.tx)
    }
}

/// A prepared select with its bound parameters.
pub struct Selection<'conn> {
    statement: Statement<'conn>,
    params: Vec<Value>,
    columns: Arc<[String]>,
}

impl<'conn> Selection<'conn> {
    fn new(statement: Statement<'conn>, params: Vec<Value>) -> Self {
        let columns = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            statement,
            params,
            columns,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Execute the query. Each call starts a fresh pass over the results.
    pub fn cursor(&mut self) -> Result<Cursor<'_>> {
        let rows = self.statement.query(params_from_iter(self.params.iter()))?;
        Ok(Cursor {
            rows,
            columns: Arc::clone(&self.columns),
        })
    }

    pub fn fetch_one(&mut self) -> Result<Option<Record>> {
        self.cursor()?.fetch_one()
    }

    pub fn fetch_all(&mut self) -> Result<Vec<Record>> {
        self.cursor()?.fetch_all()
    }
}

/// Forward-only rows of a running select. Once exhausted it stays exhausted.
pub struct Cursor<'stmt> {
    rows: Rows<'stmt>,
    columns: Arc<[String]>,
}

impl Cursor<'_> {
    /// Pull the next row, if any.
    pub fn fetch_one(&mut self) -> Result<Option<Record>> {
        match self.rows.next()? {
            Some(row) => Ok(Some(read_record(row, &self.columns)?)),
            None => Ok(None),
        }
    }

    /// Drain the remaining rows.
    pub fn fetch_all(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.fetch_one()? {
            records.push(record);
        }
        Ok(records)
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_one().transpose()
    }
}

fn read_record(row: &Row<'_>, columns: &[String]) -> Result<Record> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        record.set(column, row.get::<_, Value>(index)?);
    }
    Ok(record)
}

fn execute(conn: &Connection, query: &SqlQuery) -> Result<usize> {
    debug!(statement = %query.statement, params = query.params.len(), "execute");
    Ok(conn.execute(&query.statement, params_from_iter(query.params.iter()))?)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut statement = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let names = statement
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn same_columns(existing: &[String], requested: &Columns) -> bool {
    existing.len() == requested.len()
        && existing
            .iter()
            .zip(requested.names())
            .all(|(have, want)| have.eq_ignore_ascii_case(want))
}

/// Fail fast on columns the live table does not have. SQLite would otherwise
/// read an unknown double-quoted identifier as a string literal.
fn check_columns<'a>(
    conn: &Connection,
    table: &str,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let known = table_columns(conn, table)?;
    if known.is_empty() {
        return Err(StoreError::UnknownTable(table.to_string()));
    }
    for field in fields {
        if !known.iter().any(|column| column.eq_ignore_ascii_case(field)) {
            return Err(StoreError::UnknownColumn {
                table: table.to_string(),
                column: field.to_string(),
            });
        }
    }
    Ok(())
}

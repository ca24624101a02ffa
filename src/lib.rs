//! SQLite-backed table store for the Barky bookmark manager.
//!
//! # Intention
//!
//! - Provide a small, generic API over one SQLite file: create and drop
//!   tables from runtime column definitions, add rows, delete rows by
//!   equality criteria, select rows through a lazy cursor.
//! - Keep every value behind parameter binding; only validated, quoted
//!   identifiers are ever interpolated into SQL.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No bookmark-specific logic: the command layer decides table shapes.

pub mod error;
pub mod query;
pub mod schema;
pub mod sqlite;
pub mod value;

pub use error::{ErrorKind, Result, StoreError};
pub use query::{Criteria, Direction, OrderBy, Record, SqlQuery};
pub use schema::{ColumnDefinition, Columns, Schema, TableDefinition};
pub use sqlite::{Cursor, Selection, StoreConfig, StoreTransaction, TableOps, TableStore};
pub use value::Value;

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Coarse classification of every [`StoreError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    StorageUnavailable,
    SchemaConflict,
    ConstraintViolation,
    ResourceBusy,
    QueryError,
    InvalidInput,
}

/// Errors surfaced by the table store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open database at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("database storage error: {0}")]
    Storage(#[source] rusqlite::Error),
    #[error("store is closed")]
    Closed,
    #[error("table {table} already exists with columns ({existing}), requested ({requested})")]
    SchemaConflict {
        table: String,
        existing: String,
        requested: String,
    },
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[source] rusqlite::Error),
    #[error("database busy: {0}")]
    ResourceBusy(#[source] rusqlite::Error),
    #[error("no such table: {0}")]
    UnknownTable(String),
    #[error("no such column: {table}.{column}")]
    UnknownColumn { table: String, column: String },
    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("table {0} needs at least one column")]
    EmptyColumns(String),
    #[error("record for table {0} has no fields")]
    EmptyRecord(String),
    #[error("invalid order by clause {0:?}")]
    InvalidOrderBy(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageUnavailable { .. } | Self::Storage(_) | Self::Closed => {
                ErrorKind::StorageUnavailable
            }
            Self::SchemaConflict { .. } => ErrorKind::SchemaConflict,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::ResourceBusy(_) => ErrorKind::ResourceBusy,
            Self::UnknownTable(_) | Self::UnknownColumn { .. } | Self::Query(_) => {
                ErrorKind::QueryError
            }
            Self::InvalidIdentifier(_)
            | Self::EmptyColumns(_)
            | Self::EmptyRecord(_)
            | Self::InvalidOrderBy(_) => ErrorKind::InvalidInput,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
            _ => None,
        };
        match code {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(err),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::ResourceBusy(err),
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::NotADatabase
                | ErrorCode::DiskFull
                | ErrorCode::SystemIoFailure,
            ) => Self::Storage(err),
            _ => Self::Query(err),
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn classifies_engine_result_codes() {
        assert_eq!(
            StoreError::from(failure(ffi::SQLITE_CONSTRAINT)).kind(),
            ErrorKind::ConstraintViolation
        );
        assert_eq!(StoreError::from(failure(ffi::SQLITE_BUSY)).kind(), ErrorKind::ResourceBusy);
        assert_eq!(StoreError::from(failure(ffi::SQLITE_LOCKED)).kind(), ErrorKind::ResourceBusy);
        assert_eq!(
            StoreError::from(failure(ffi::SQLITE_CANTOPEN)).kind(),
            ErrorKind::StorageUnavailable
        );
        assert_eq!(StoreError::from(failure(ffi::SQLITE_ERROR)).kind(), ErrorKind::QueryError);
    }

    #[test]
    fn non_engine_errors_are_query_errors() {
        let err = StoreError::from(rusqlite::Error::InvalidColumnIndex(9));
        assert_eq!(err.kind(), ErrorKind::QueryError);
    }

    #[test]
    fn closed_store_reports_storage_unavailable() {
        assert_eq!(StoreError::Closed.kind(), ErrorKind::StorageUnavailable);
        assert_eq!(StoreError::Closed.to_string(), "store is closed");
    }
}

//! Error type for `bazaar-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A business rule rejected the operation; the transaction was rolled back.
  #[error(transparent)]
  Core(#[from] bazaar_core::Error),

  /// The write lock could not be taken within the busy timeout.
  #[error("database is locked by another writer")]
  Contention,

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value that no longer decodes into its domain type.
  #[error("corrupt {column} value {value:?}")]
  Decode { column: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn is_busy(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

/// `true` for a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == ErrorCode::ConstraintViolation
        && matches!(
          f.extended_code,
          rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
  )
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    if is_busy(&e) {
      Self::Contention
    } else {
      Self::Database(tokio_rusqlite::Error::Rusqlite(e))
    }
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(inner) => inner.into(),
      other => Self::Database(other),
    }
  }
}

impl From<Error> for bazaar_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      Error::Contention => Self::ContentionRetry,
      other => {
        tracing::error!(error = %other, "storage failure");
        Self::Storage(Box::new(other))
      }
    }
  }
}

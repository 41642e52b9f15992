//! Error types and result definitions for shard-DDL reconciliation.
//!
//! Provides a kind-classified error type with a static description, optional
//! dynamic detail and an optional source error, plus the callsite location of
//! the failure. Construction goes through the [`crate::sync_error!`] and
//! [`crate::bail!`] macros.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use shardsync_mysql::replication::GtidError;
use shardsync_mysql::types::TableIdentError;

/// Convenient result type using [`SyncError`] as the error type.
pub type SyncResult<T> = Result<T, SyncError>;

/// Specific categories of errors that can occur during shard-DDL
/// reconciliation.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Persisted sequence bytes could not be decoded. Fatal to recovering the
    /// affected shard group.
    DeserializationError,
    /// A sequence could not be encoded for persistence.
    SerializationError,
    /// Persisted GTID text could not be reparsed against the configured
    /// replication flavor. Fatal to recovering the affected shard group.
    InvalidGtid,
    /// A shard source's DDL content disagrees with the already established
    /// global sequence at the same step. Requires operator intervention.
    DdlSequenceDiverged,
    /// The active index is past the end of the global sequence. Indicates a
    /// bug in the caller's use of the API, not a recoverable condition.
    ActiveIndexOutOfRange,
    /// A qualified source table identity could not be parsed during rename
    /// remapping.
    InvalidSourceTableId,
    /// A query against the meta database failed.
    QueryFailed,
    Unknown,
}

/// Main error type for shard-DDL reconciliation operations.
#[derive(Debug, Clone)]
pub struct SyncError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

impl SyncError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance. The stored source is exposed via
    /// [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`SyncError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        SyncError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
        }
    }
}

/// Errors compare equal when they carry the same kind; the dynamic parts are
/// diagnostic only.
impl PartialEq for SyncError {
    fn eq(&self, other: &SyncError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for SyncError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`SyncError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for SyncError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> SyncError {
        SyncError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`SyncError`] from an error kind, static description, and dynamic
/// detail.
impl<D> From<(ErrorKind, &'static str, D)> for SyncError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> SyncError {
        SyncError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`serde_json::Error`] to [`SyncError`] with the appropriate error
/// kind based on error classification.
impl From<serde_json::Error> for SyncError {
    #[track_caller]
    fn from(err: serde_json::Error) -> SyncError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => {
                (ErrorKind::SerializationError, "JSON I/O operation failed")
            }
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        SyncError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`GtidError`] to [`SyncError`] with [`ErrorKind::InvalidGtid`].
impl From<GtidError> for SyncError {
    #[track_caller]
    fn from(err: GtidError) -> SyncError {
        let detail = err.to_string();
        SyncError::from_components(
            ErrorKind::InvalidGtid,
            Cow::Borrowed("GTID parsing failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`TableIdentError`] to [`SyncError`] with
/// [`ErrorKind::InvalidSourceTableId`].
impl From<TableIdentError> for SyncError {
    #[track_caller]
    fn from(err: TableIdentError) -> SyncError {
        let detail = err.to_string();
        SyncError::from_components(
            ErrorKind::InvalidSourceTableId,
            Cow::Borrowed("Source table identity parsing failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`sqlx::Error`] to [`SyncError`] with [`ErrorKind::QueryFailed`].
#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for SyncError {
    #[track_caller]
    fn from(err: sqlx::Error) -> SyncError {
        let detail = err.to_string();
        SyncError::from_components(
            ErrorKind::QueryFailed,
            Cow::Borrowed("Meta database operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_kind_and_detail() {
        let err = crate::sync_error!(
            ErrorKind::DdlSequenceDiverged,
            "shard source DDL sequence diverged",
            "source: [], global: []"
        );

        assert_eq!(err.kind(), ErrorKind::DdlSequenceDiverged);
        assert_eq!(err.detail(), Some("source: [], global: []"));
        assert!(err.to_string().contains("diverged"));
    }

    #[test]
    fn test_errors_compare_by_kind() {
        let a = crate::sync_error!(ErrorKind::ActiveIndexOutOfRange, "one");
        let b = crate::sync_error!(ErrorKind::ActiveIndexOutOfRange, "two", "detail");
        let c = crate::sync_error!(ErrorKind::Unknown, "one");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_json_error_classification() {
        let err: SyncError = serde_json::from_str::<Vec<String>>("{not json")
            .unwrap_err()
            .into();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
        assert!(std::error::Error::source(&err).is_some());
    }
}

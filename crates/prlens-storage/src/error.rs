//! Error types for prlens-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds (spec §7: the subset of error kinds that originate
/// at the vector-store/mart adapter boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Vector store or SQL connection/query failure.
    Database,
    /// Serialization/deserialization errors.
    Serialization,
    /// PR row not found in the vector store.
    PrNotFound,
    /// Repository has no materialized rows.
    RepositoryNotFound,
    /// File row not found in the vector store.
    FileNotFound,
    /// Transaction/batch-upsert errors (MartConflict before per-row fallback).
    Transaction,
    /// Vector dimension or schema mismatch (SchemaViolation, locally coerced
    /// by the caller — this kind exists for cases that can't be coerced).
    SchemaViolation,
    /// Malformed scalar filter expression (QueryBad).
    QueryBad,
    /// Configuration errors.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::PrNotFound => "pr_not_found",
            ErrorKind::RepositoryNotFound => "repository_not_found",
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::Transaction => "transaction",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::QueryBad => "query_bad",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn pr_not_found(pr_id: impl Into<String>) -> Self {
        Self::new(ErrorKind::PrNotFound, format!("PR not found: {}", pr_id.into()))
    }

    pub fn repository_not_found(repo_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::RepositoryNotFound, format!("Repository not found: {}", repo_name.into()))
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    pub fn query_bad(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QueryBad, message)
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::database(format!("SQL error: {err}")).with_source(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {err}")).with_source(err)
    }
}

impl From<qdrant_client::QdrantError> for StorageError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        StorageError::database(format!("vector store error: {err}")).with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = StorageError::pr_not_found("acme/widgets#42");
        let msg = format!("{err}");
        assert!(msg.contains("pr_not_found"));
        assert!(msg.contains("acme/widgets#42"));
    }

    #[test]
    fn test_database_error() {
        let err = StorageError::database("Connection failed");
        assert_eq!(err.kind, ErrorKind::Database);
        assert_eq!(err.message, "Connection failed");
        assert!(err.source.is_none());
        assert_eq!(format!("{err}"), "[database] Connection failed");
    }

    #[test]
    fn test_repository_not_found() {
        let err = StorageError::repository_not_found("acme/widgets");
        assert_eq!(err.kind, ErrorKind::RepositoryNotFound);
        assert!(err.message.contains("acme/widgets"));
    }

    #[test]
    fn test_with_source() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = StorageError::database("DB file missing").with_source(io_err);

        assert_eq!(err.kind, ErrorKind::Database);
        assert!(err.source.is_some());
        let source = err.source().unwrap();
        assert!(source.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").err().unwrap();
        let err: StorageError = json_err.into();
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.message.contains("JSON error"));
    }

    #[test]
    fn test_result_propagation() {
        fn inner() -> Result<()> {
            Err(StorageError::pr_not_found("test"))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        let err = outer().unwrap_err();
        assert_eq!(err.kind, ErrorKind::PrNotFound);
    }
}

//! Domain layer for the dual-index materialization stores (spec §4.4, §4.5).
//!
//! # Core Principles
//!
//! 1. **Two collections, two primary keys.** VS-PR is keyed by
//!    `(repo_name, pr_id)`; VS-File is keyed by `(repo_name, pr_id, file_id)`.
//! 2. **Logical upsert.** Every write replaces the row identified by its key
//!    atomically from the caller's perspective — no concurrent reader ever
//!    observes a half-written PR.
//! 3. **Combinator-built filters.** Scalar expressions are never string-
//!    concatenated ad hoc; they are built from [`ScalarExpr`] and rendered
//!    once at the adapter boundary, with quoting centralized.
//!
//! # Port Traits
//!
//! - [`VectorStore`]: PR/file index with scalar query and ANN search.
//! - [`RelationalMart`]: the five analytic tables, batched upsert.
//!
//! # Examples
//!
//! ```rust,ignore
//! use prlens_storage::domain::{VectorStore, ScalarExpr};
//!
//! async fn example(store: &impl VectorStore) -> prlens_storage::Result<()> {
//!     let expr = ScalarExpr::and(vec![
//!         ScalarExpr::eq("repo_name", "acme/widgets"),
//!         ScalarExpr::gte("merged_at", 0.0),
//!     ]);
//!     let rows = store.query_prs(&expr, 50).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use prlens_core::{FileRecord, PrRecord};

use crate::Result;

pub mod mart;

pub use mart::{AuthorFileOwnership, AuthorMetricsDaily, AuthorMetricsWindow, AuthorPrsWindow, AuthorRow, RepoPr};

// ═══════════════════════════════════════════════════════════════════════════
// Scalar filter combinators
// ═══════════════════════════════════════════════════════════════════════════

/// A scalar value usable on the right-hand side of a [`ScalarExpr`]
/// comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}
impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}
impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Num(n)
    }
}
impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Num(n as f64)
    }
}
impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

/// Scalar filter expression tree (spec §4.4: explicit operators `==`, `>=`,
/// `<=`, `and`, `like`; string literals double-quoted with caller content
/// escaped at render time).
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    Eq(String, ScalarValue),
    Gte(String, ScalarValue),
    Lte(String, ScalarValue),
    Like(String, String),
    And(Vec<ScalarExpr>),
}

impl ScalarExpr {
    pub fn eq(field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        ScalarExpr::Eq(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        ScalarExpr::Gte(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        ScalarExpr::Lte(field.into(), value.into())
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        ScalarExpr::Like(field.into(), pattern.into())
    }

    pub fn and(clauses: Vec<ScalarExpr>) -> Self {
        ScalarExpr::And(clauses)
    }

    /// Renders this expression to the adapter's filter-string form, escaping
    /// double quotes inside string literals (the adapter is responsible for
    /// escaping, per spec §4.4 — centralized here rather than at each call
    /// site).
    pub fn render(&self) -> String {
        match self {
            ScalarExpr::Eq(field, value) => format!("{field} == {}", render_value(value)),
            ScalarExpr::Gte(field, value) => format!("{field} >= {}", render_value(value)),
            ScalarExpr::Lte(field, value) => format!("{field} <= {}", render_value(value)),
            ScalarExpr::Like(field, pattern) => format!("{field} like \"{}\"", escape(pattern)),
            ScalarExpr::And(clauses) => {
                clauses.iter().map(|c| format!("({})", c.render())).collect::<Vec<_>>().join(" and ")
            }
        }
    }
}

fn render_value(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Str(s) => format!("\"{}\"", escape(s)),
        ScalarValue::Num(n) => n.to_string(),
        ScalarValue::Bool(b) => b.to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// A PR row returned by an ANN search, carrying the index distance.
#[derive(Debug, Clone)]
pub struct PrHit {
    pub record: PrRecord,
    pub distance: f32,
}

/// A file row returned by an ANN search, carrying the index distance.
#[derive(Debug, Clone)]
pub struct FileHit {
    pub record: FileRecord,
    pub distance: f32,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port trait: VectorStore
// ═══════════════════════════════════════════════════════════════════════════

/// Primary storage abstraction for the two-collection vector index
/// (spec §4.4).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates both collections with a cosine-metric IVF_FLAT index
    /// (`nlist = 1024`) on the `vector` field, if they don't already exist.
    async fn ensure_collections(&self, dim: usize) -> Result<()>;

    /// Upserts PR rows by `(repo_name, pr_id)`, in batches of 50 with a
    /// per-row fallback on batch failure (spec §4.4, §5).
    async fn upsert_prs(&self, rows: &[PrRecord]) -> Result<()>;

    /// Upserts file rows by `(repo_name, pr_id, file_id)`, same batching
    /// policy as `upsert_prs`.
    async fn upsert_files(&self, rows: &[FileRecord]) -> Result<()>;

    /// `QueryPRs(expr, fields, limit)` — scalar only.
    async fn query_prs(&self, expr: &ScalarExpr, limit: usize) -> Result<Vec<PrRecord>>;

    /// `SearchPRs(vec, expr, fields, k)` — ANN with scalar prefilter,
    /// `nprobe = 10`.
    async fn search_prs(&self, vector: &[f32], expr: &ScalarExpr, k: usize) -> Result<Vec<PrHit>>;

    /// `QueryFiles(expr, fields, limit)` — scalar only.
    async fn query_files(&self, expr: &ScalarExpr, limit: usize) -> Result<Vec<FileRecord>>;

    /// `SearchFiles(vec, expr, fields, k)` — ANN with scalar prefilter.
    async fn search_files(&self, vector: &[f32], expr: &ScalarExpr, k: usize) -> Result<Vec<FileHit>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Port trait: RelationalMart
// ═══════════════════════════════════════════════════════════════════════════

/// Primary storage abstraction for the five analytic tables (spec §4.5).
/// Conflict resolution is always "update all non-key columns, set
/// `updated_at := now`"; batches of 50 rows, falling back to per-row upsert
/// on batch failure.
#[async_trait]
pub trait RelationalMart: Send + Sync {
    async fn upsert_authors(&self, rows: &[AuthorRow]) -> Result<()>;
    async fn upsert_daily_metrics(&self, rows: &[AuthorMetricsDaily]) -> Result<()>;
    async fn upsert_window_metrics(&self, rows: &[AuthorMetricsWindow]) -> Result<()>;
    async fn upsert_file_ownership(&self, rows: &[AuthorFileOwnership]) -> Result<()>;
    async fn upsert_prs_window(&self, rows: &[AuthorPrsWindow]) -> Result<()>;
    async fn upsert_repo_prs(&self, rows: &[RepoPr]) -> Result<()>;

    /// Truncates only the downstream aggregate tables (not `repo_prs`,
    /// which the spec treats as re-derivable from the vector store on a
    /// forced refresh) for a given repo.
    async fn truncate_aggregates(&self, repo_name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_eq() {
        let expr = ScalarExpr::eq("repo_name", "acme/widgets");
        assert_eq!(expr.render(), "repo_name == \"acme/widgets\"");
    }

    #[test]
    fn render_and_combinator() {
        let expr = ScalarExpr::and(vec![
            ScalarExpr::eq("repo_name", "acme/widgets"),
            ScalarExpr::gte("merged_at", 100i64),
            ScalarExpr::lte("merged_at", 200i64),
        ]);
        assert_eq!(
            expr.render(),
            "(repo_name == \"acme/widgets\") and (merged_at >= 100) and (merged_at <= 200)"
        );
    }

    #[test]
    fn escapes_embedded_quotes() {
        let expr = ScalarExpr::eq("title", "say \"hi\"");
        assert_eq!(expr.render(), "title == \"say \\\"hi\\\"\"");
    }

    #[test]
    fn render_like() {
        let expr = ScalarExpr::like("file_id", "%handler%");
        assert_eq!(expr.render(), "file_id like \"%handler%\"");
    }
}

//! Dual-index materialization (spec §2, component group "Dual-Index
//! Materialization"): a vector store adapter (C4, two collections) and a
//! relational mart adapter (C5, five analytic tables).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use prlens_storage::{VectorStore, ScalarExpr, QdrantVectorStore};
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", None)?;
//! store.ensure_collections(1536).await?;
//! store.upsert_prs(&enriched_prs).await?;
//!
//! let expr = ScalarExpr::eq("repo_name", "acme/widgets");
//! let rows = store.query_prs(&expr, 50).await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Result, StorageError};

pub use domain::{FileHit, PrHit, RelationalMart, ScalarExpr, ScalarValue, VectorStore};
pub use infrastructure::{PostgresMart, QdrantVectorStore};

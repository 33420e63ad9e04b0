//! Infrastructure layer — storage adapters.
//!
//! - `qdrant`: vector store adapter (C4).
//! - `postgres`: relational mart adapter (C5).

pub mod postgres;
pub mod qdrant;

pub use postgres::PostgresMart;
pub use qdrant::QdrantVectorStore;

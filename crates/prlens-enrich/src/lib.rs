//! Enrichment engine (C3): per-PR orchestration from forge data to a fully
//! scored, embedded `PrRecord`.

pub mod enricher;
pub mod error;
pub mod feature;
pub mod risk_aggregate;

pub use enricher::{EnrichConfig, PrEnricher};
pub use error::{EnrichError, Result};

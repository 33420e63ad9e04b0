//! The JSON format `ingest` writes and `vector-load` reads (spec.md §6:
//! `{summary: {...}, pull_requests: [PR...]}`).

use serde::{Deserialize, Serialize};

use prlens_core::PrRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub repo: String,
    pub state: String,
    pub prs_crawled: usize,
    pub prs_enriched: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedIngest {
    pub summary: IngestSummary,
    pub pull_requests: Vec<PrRecord>,
}

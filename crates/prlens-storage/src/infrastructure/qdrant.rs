//! Qdrant-backed `VectorStore` adapter (spec §4.4).
//!
//! Two collections, `pr_index` and `file_index`, each with a cosine-metric
//! index on `vector`. Rows are stored as a JSON payload alongside the
//! vector and rehydrated into `PrRecord`/`FileRecord` on read, so the
//! payload schema tracks the domain type directly rather than a hand-kept
//! mirror.

use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::warn;

use prlens_core::{FileRecord, PrRecord};

use crate::domain::{FileHit, PrHit, ScalarExpr, ScalarValue, VectorStore};
use crate::error::StorageError;
use crate::Result;

const PR_COLLECTION: &str = "pr_index";
const FILE_COLLECTION: &str = "file_index";
const UPSERT_BATCH_SIZE: usize = 50;
const NPROBE: u64 = 10;

pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(StorageError::from)?;
        Ok(Self { client })
    }

    async fn ensure_collection(&self, name: &str, dim: usize) -> Result<()> {
        let exists = self.client.collection_exists(name).await.map_err(StorageError::from)?;
        if exists {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
            )
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<PointStruct>) -> Result<()> {
        for chunk in points.chunks(UPSERT_BATCH_SIZE) {
            let batch = chunk.to_vec();
            let result = self
                .client
                .upsert_points(UpsertPointsBuilder::new(collection, batch.clone()))
                .await;
            if result.is_err() {
                warn!(collection, batch_size = batch.len(), "batch upsert failed, falling back to per-row");
                for point in batch {
                    if let Err(e) = self.client.upsert_points(UpsertPointsBuilder::new(collection, vec![point])).await
                    {
                        warn!(collection, error = %e, "per-row upsert failed, skipping row");
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collections(&self, dim: usize) -> Result<()> {
        self.ensure_collection(PR_COLLECTION, dim).await?;
        self.ensure_collection(FILE_COLLECTION, dim).await
    }

    async fn upsert_prs(&self, rows: &[PrRecord]) -> Result<()> {
        let points = rows
            .iter()
            .map(|r| {
                let payload: Payload = serde_json::to_value(r).unwrap_or_default().try_into().unwrap_or_default();
                PointStruct::new(pr_point_id(&r.repo_name, &r.pr_id), r.vector.clone(), payload)
            })
            .collect();
        self.upsert_points(PR_COLLECTION, points).await
    }

    async fn upsert_files(&self, rows: &[FileRecord]) -> Result<()> {
        let points = rows
            .iter()
            .map(|r| {
                let payload: Payload = serde_json::to_value(r).unwrap_or_default().try_into().unwrap_or_default();
                PointStruct::new(file_point_id(&r.repo_name, &r.pr_id, &r.file_id), r.vector.clone(), payload)
            })
            .collect();
        self.upsert_points(FILE_COLLECTION, points).await
    }

    async fn query_prs(&self, expr: &ScalarExpr, limit: usize) -> Result<Vec<PrRecord>> {
        let filter = to_qdrant_filter(expr);
        let hits = self
            .client
            .scroll(
                qdrant_client::qdrant::ScrollPointsBuilder::new(PR_COLLECTION)
                    .filter(filter)
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await
            .map_err(StorageError::from)?;
        Ok(hits.result.into_iter().filter_map(|p| payload_to::<PrRecord>(p.payload)).collect())
    }

    async fn search_prs(&self, vector: &[f32], expr: &ScalarExpr, k: usize) -> Result<Vec<PrHit>> {
        let filter = to_qdrant_filter(expr);
        let result = self
            .client
            .search_points(
                SearchPointsBuilder::new(PR_COLLECTION, vector.to_vec(), k as u64)
                    .filter(filter)
                    .params(qdrant_client::qdrant::SearchParamsBuilder::default().hnsw_ef(NPROBE as usize))
                    .with_payload(true),
            )
            .await
            .map_err(StorageError::from)?;
        Ok(result
            .result
            .into_iter()
            .filter_map(|p| payload_to::<PrRecord>(p.payload).map(|record| PrHit { record, distance: p.score }))
            .collect())
    }

    async fn query_files(&self, expr: &ScalarExpr, limit: usize) -> Result<Vec<FileRecord>> {
        let filter = to_qdrant_filter(expr);
        let hits = self
            .client
            .scroll(
                qdrant_client::qdrant::ScrollPointsBuilder::new(FILE_COLLECTION)
                    .filter(filter)
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await
            .map_err(StorageError::from)?;
        Ok(hits.result.into_iter().filter_map(|p| payload_to::<FileRecord>(p.payload)).collect())
    }

    async fn search_files(&self, vector: &[f32], expr: &ScalarExpr, k: usize) -> Result<Vec<FileHit>> {
        let filter = to_qdrant_filter(expr);
        let result = self
            .client
            .search_points(
                SearchPointsBuilder::new(FILE_COLLECTION, vector.to_vec(), k as u64)
                    .filter(filter)
                    .params(qdrant_client::qdrant::SearchParamsBuilder::default().hnsw_ef(NPROBE as usize))
                    .with_payload(true),
            )
            .await
            .map_err(StorageError::from)?;
        Ok(result
            .result
            .into_iter()
            .filter_map(|p| payload_to::<FileRecord>(p.payload).map(|record| FileHit { record, distance: p.score }))
            .collect())
    }
}

fn payload_to<T: serde::de::DeserializeOwned>(payload: std::collections::HashMap<String, qdrant_client::qdrant::Value>) -> Option<T> {
    let json = qdrant_client::Payload::from(payload).into();
    serde_json::from_value(json).ok()
}

/// Deterministic point ID derived from the logical PK so re-ingest upserts
/// the same point rather than creating duplicates.
fn pr_point_id(repo_name: &str, pr_id: &str) -> u64 {
    hash_key(&format!("{repo_name}:{pr_id}"))
}

fn file_point_id(repo_name: &str, pr_id: &str, file_id: &str) -> u64 {
    hash_key(&format!("{repo_name}:{pr_id}:{file_id}"))
}

fn hash_key(key: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Translates the combinator filter tree directly into Qdrant's structured
/// filter, rather than round-tripping through `ScalarExpr::render`'s string
/// form (spec §9: centralize rendering/escaping at the adapter boundary).
fn to_qdrant_filter(expr: &ScalarExpr) -> Filter {
    Filter::must(to_conditions(expr))
}

fn to_conditions(expr: &ScalarExpr) -> Vec<Condition> {
    match expr {
        ScalarExpr::And(clauses) => clauses.iter().flat_map(to_conditions).collect(),
        ScalarExpr::Eq(field, value) => vec![match value {
            ScalarValue::Str(s) => Condition::matches(field, s.clone()),
            ScalarValue::Num(n) => Condition::matches(field, *n as i64),
            ScalarValue::Bool(b) => Condition::matches(field, *b),
        }],
        ScalarExpr::Gte(field, value) => {
            vec![Condition::range(field, qdrant_client::qdrant::Range { gte: Some(scalar_f64(value)), ..Default::default() })]
        }
        ScalarExpr::Lte(field, value) => {
            vec![Condition::range(field, qdrant_client::qdrant::Range { lte: Some(scalar_f64(value)), ..Default::default() })]
        }
        ScalarExpr::Like(field, pattern) => vec![Condition::matches_text(field, pattern.replace('%', ""))],
    }
}

fn scalar_f64(value: &ScalarValue) -> f64 {
    match value {
        ScalarValue::Num(n) => *n,
        ScalarValue::Bool(b) => *b as i64 as f64,
        ScalarValue::Str(s) => s.parse().unwrap_or(0.0),
    }
}

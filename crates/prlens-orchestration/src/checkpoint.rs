use crate::error::Result;
use crate::job::StageId;
use std::collections::HashSet;
use uuid::Uuid;

/// A checkpoint records how far one stage of one job got: the highest PR
/// number it fully processed. Resuming a job re-reads this cursor instead
/// of replaying already-materialized PRs.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub id: Uuid,
    pub job_id: Uuid,
    pub stage: StageId,
    pub cache_key: String,
    pub last_pr_number: u64,
}

impl Checkpoint {
    pub fn new(job_id: Uuid, stage: StageId, cache_key: String, last_pr_number: u64) -> Self {
        Self { id: Uuid::new_v4(), job_id, stage, cache_key, last_pr_number }
    }
}

/// Checkpoint manager (SQLite-backed in the teacher; kept in-memory here
/// since a single orchestrator process owns a job end to end and
/// resumption only needs to survive a process restart, not a crash mid
/// transaction).
pub struct CheckpointManager {
    checkpoints: std::sync::Arc<parking_lot::Mutex<Vec<Checkpoint>>>,
}

impl CheckpointManager {
    pub fn new_in_memory() -> Self {
        Self { checkpoints: std::sync::Arc::new(parking_lot::Mutex::new(Vec::new())) }
    }

    pub async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock();
        checkpoints.retain(|cp| !(cp.job_id == checkpoint.job_id && cp.stage == checkpoint.stage));
        checkpoints.push(checkpoint);
        Ok(())
    }

    /// Load the resume cursor for a cache key, if a checkpoint was saved
    /// under it.
    pub async fn load_checkpoint(&self, cache_key: &str) -> Result<Option<u64>> {
        let checkpoints = self.checkpoints.lock();
        Ok(checkpoints.iter().find(|cp| cp.cache_key == cache_key).map(|cp| cp.last_pr_number))
    }

    pub async fn completed_stages(&self, job_id: Uuid) -> Result<HashSet<StageId>> {
        let checkpoints = self.checkpoints.lock();
        Ok(checkpoints.iter().filter(|cp| cp.job_id == job_id).map(|cp| cp.stage).collect())
    }

    /// Highest `last_pr_number` checkpointed for a repo's `Materialize`
    /// stage, across any job — the resumption cursor a fresh job for that
    /// repo should start from.
    pub async fn last_materialized_pr(&self, repo_cache_key: &str) -> Result<Option<u64>> {
        let checkpoints = self.checkpoints.lock();
        Ok(checkpoints
            .iter()
            .filter(|cp| cp.stage == StageId::Materialize && cp.cache_key == repo_cache_key)
            .map(|cp| cp.last_pr_number)
            .max())
    }

    pub async fn delete_job_checkpoints(&self, job_id: Uuid) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock();
        checkpoints.retain(|cp| cp.job_id != job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load_checkpoint() {
        let mgr = CheckpointManager::new_in_memory();
        let job_id = Uuid::new_v4();

        let cp = Checkpoint::new(job_id, StageId::Materialize, "materialize:acme/widgets".to_string(), 42);
        mgr.save_checkpoint(cp).await.unwrap();

        let loaded = mgr.load_checkpoint("materialize:acme/widgets").await.unwrap();
        assert_eq!(loaded, Some(42));
    }

    #[tokio::test]
    async fn test_save_checkpoint_replaces_existing() {
        let mgr = CheckpointManager::new_in_memory();
        let job_id = Uuid::new_v4();

        let cp1 = Checkpoint::new(job_id, StageId::Materialize, "materialize:acme/widgets".to_string(), 10);
        mgr.save_checkpoint(cp1).await.unwrap();

        let cp2 = Checkpoint::new(job_id, StageId::Materialize, "materialize:acme/widgets".to_string(), 25);
        mgr.save_checkpoint(cp2).await.unwrap();

        let loaded = mgr.load_checkpoint("materialize:acme/widgets").await.unwrap();
        assert_eq!(loaded, Some(25));
    }

    #[tokio::test]
    async fn test_completed_stages() {
        let mgr = CheckpointManager::new_in_memory();
        let job_id = Uuid::new_v4();

        let cp1 = Checkpoint::new(job_id, StageId::Crawl, "crawl:acme/widgets".to_string(), 10);
        let cp2 = Checkpoint::new(job_id, StageId::Enrich, "enrich:acme/widgets".to_string(), 10);

        mgr.save_checkpoint(cp1).await.unwrap();
        mgr.save_checkpoint(cp2).await.unwrap();

        let completed = mgr.completed_stages(job_id).await.unwrap();
        assert_eq!(completed.len(), 2);
        assert!(completed.contains(&StageId::Crawl));
        assert!(completed.contains(&StageId::Enrich));
    }

    #[tokio::test]
    async fn test_last_materialized_pr_is_max_across_jobs() {
        let mgr = CheckpointManager::new_in_memory();

        let cp1 = Checkpoint::new(Uuid::new_v4(), StageId::Materialize, "materialize:acme/widgets".to_string(), 10);
        let cp2 = Checkpoint::new(Uuid::new_v4(), StageId::Materialize, "materialize:acme/widgets".to_string(), 30);
        mgr.save_checkpoint(cp1).await.unwrap();
        mgr.save_checkpoint(cp2).await.unwrap();

        let cursor = mgr.last_materialized_pr("materialize:acme/widgets").await.unwrap();
        assert_eq!(cursor, Some(30));
    }

    #[tokio::test]
    async fn test_delete_job_checkpoints() {
        let mgr = CheckpointManager::new_in_memory();
        let job_id = Uuid::new_v4();

        let cp = Checkpoint::new(job_id, StageId::Crawl, "crawl:acme/widgets".to_string(), 10);
        mgr.save_checkpoint(cp).await.unwrap();

        mgr.delete_job_checkpoints(job_id).await.unwrap();

        let completed = mgr.completed_stages(job_id).await.unwrap();
        assert_eq!(completed.len(), 0);
    }

    #[tokio::test]
    async fn test_load_nonexistent_checkpoint() {
        let mgr = CheckpointManager::new_in_memory();
        let loaded = mgr.load_checkpoint("nonexistent").await.unwrap();
        assert_eq!(loaded, None);
    }
}

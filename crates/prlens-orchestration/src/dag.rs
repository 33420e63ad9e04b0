use crate::error::{OrchestratorError, Result};
use crate::job::StageId;
use std::collections::{HashMap, HashSet};

/// Cache key manager, keyed by repository only — PR ingestion has no
/// snapshot concept, just a running cursor per repo per stage.
#[derive(Debug, Clone)]
pub struct CacheKeyManager {
    repo_id: String,
}

impl CacheKeyManager {
    pub fn new(repo_id: String) -> Self {
        Self { repo_id }
    }

    pub fn crawl_key(&self) -> String {
        format!("crawl:{}", self.repo_id)
    }

    pub fn enrich_key(&self) -> String {
        format!("enrich:{}", self.repo_id)
    }

    pub fn materialize_key(&self) -> String {
        format!("materialize:{}", self.repo_id)
    }

    pub fn project_key(&self) -> String {
        format!("project:{}", self.repo_id)
    }

    pub fn mart_upsert_key(&self) -> String {
        format!("mart_upsert:{}", self.repo_id)
    }

    pub fn key_for_stage(&self, stage: StageId) -> String {
        match stage {
            StageId::Crawl => self.crawl_key(),
            StageId::Enrich => self.enrich_key(),
            StageId::Materialize => self.materialize_key(),
            StageId::Project => self.project_key(),
            StageId::MartUpsert => self.mart_upsert_key(),
        }
    }
}

/// Stage node in the DAG.
#[derive(Debug, Clone)]
pub struct StageNode {
    pub id: StageId,
    pub name: &'static str,
    pub dependencies: Vec<StageId>,
    pub optional: bool,
    pub timeout_ms: u64,
}

impl StageNode {
    pub fn new(id: StageId, name: &'static str, dependencies: Vec<StageId>, optional: bool, timeout_ms: u64) -> Self {
        Self { id, name, dependencies, optional, timeout_ms }
    }
}

/// Pipeline DAG with topological sort.
#[derive(Debug, Clone)]
pub struct PipelineDAG {
    stages: HashMap<StageId, StageNode>,
    execution_order: Vec<Vec<StageId>>,
}

impl PipelineDAG {
    pub fn new(stages: Vec<StageNode>) -> Result<Self> {
        let mut stage_map = HashMap::new();
        for stage in stages {
            stage_map.insert(stage.id, stage);
        }

        for stage in stage_map.values() {
            for dep in &stage.dependencies {
                if !stage_map.contains_key(dep) {
                    return Err(OrchestratorError::MissingDependency(format!(
                        "stage {:?} depends on non-existent stage {:?}",
                        stage.id, dep
                    )));
                }
            }
        }

        let execution_order = Self::topological_sort(&stage_map)?;

        Ok(Self { stages: stage_map, execution_order })
    }

    /// Ingestion pipeline: `Crawl -> Enrich -> Materialize`, strictly
    /// sequential — `Enrich` needs the PR numbers `Crawl` lists, and
    /// `Materialize` needs the enriched records.
    pub fn ingestion_pipeline() -> Result<Self> {
        let stages = vec![
            StageNode::new(StageId::Crawl, "Crawl PR list", vec![], false, 120_000),
            StageNode::new(StageId::Enrich, "Enrich PRs", vec![StageId::Crawl], false, 1_800_000),
            StageNode::new(StageId::Materialize, "Materialize to stores", vec![StageId::Enrich], false, 300_000),
        ];
        Self::new(stages)
    }

    /// Projection pipeline: `Project -> MartUpsert`.
    pub fn projection_pipeline() -> Result<Self> {
        let stages = vec![
            StageNode::new(StageId::Project, "Project mart rows", vec![], false, 300_000),
            StageNode::new(StageId::MartUpsert, "Upsert mart rows", vec![StageId::Project], false, 300_000),
        ];
        Self::new(stages)
    }

    fn topological_sort(stages: &HashMap<StageId, StageNode>) -> Result<Vec<Vec<StageId>>> {
        let mut in_degree: HashMap<StageId, usize> = stages.keys().map(|&id| (id, 0)).collect();

        for stage in stages.values() {
            for _dep in &stage.dependencies {
                *in_degree.get_mut(&stage.id).unwrap() += 1;
            }
        }

        let mut result = Vec::new();
        let mut processed = HashSet::new();

        while processed.len() < stages.len() {
            let ready: Vec<StageId> =
                in_degree.iter().filter(|(id, &degree)| degree == 0 && !processed.contains(*id)).map(|(&id, _)| id).collect();

            if ready.is_empty() {
                return Err(OrchestratorError::DagCycleDetected);
            }

            result.push(ready.clone());

            for &stage_id in &ready {
                processed.insert(stage_id);
                in_degree.remove(&stage_id);

                for dependent in stages.values() {
                    if dependent.dependencies.contains(&stage_id) {
                        *in_degree.get_mut(&dependent.id).unwrap() -= 1;
                    }
                }
            }
        }

        Ok(result)
    }

    pub fn execution_order(&self) -> &[Vec<StageId>] {
        &self.execution_order
    }

    pub fn get_stage(&self, id: StageId) -> Option<&StageNode> {
        self.stages.get(&id)
    }

    pub fn execution_plan(&self) -> String {
        self.execution_order
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let stage_names: Vec<_> = group.iter().map(|id| self.stages[id].name).collect();
                if group.len() > 1 {
                    format!("Phase {}: {} (parallel)", i + 1, stage_names.join(" ∥ "))
                } else {
                    format!("Phase {}: {}", i + 1, stage_names[0])
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn required_cache_keys(&self, stage_id: StageId, cache_mgr: &CacheKeyManager) -> Vec<String> {
        let stage = match self.stages.get(&stage_id) {
            Some(s) => s,
            None => return vec![],
        };

        stage.dependencies.iter().map(|dep_id| cache_mgr.key_for_stage(*dep_id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_generation() {
        let mgr = CacheKeyManager::new("acme/widgets".to_string());
        assert_eq!(mgr.crawl_key(), "crawl:acme/widgets");
        assert_eq!(mgr.enrich_key(), "enrich:acme/widgets");
        assert_eq!(mgr.materialize_key(), "materialize:acme/widgets");
        assert_eq!(mgr.project_key(), "project:acme/widgets");
        assert_eq!(mgr.mart_upsert_key(), "mart_upsert:acme/widgets");
    }

    #[test]
    fn test_cache_key_for_stage() {
        let mgr = CacheKeyManager::new("acme/widgets".to_string());
        assert_eq!(mgr.key_for_stage(StageId::Crawl), "crawl:acme/widgets");
        assert_eq!(mgr.key_for_stage(StageId::Enrich), "enrich:acme/widgets");
    }

    #[test]
    fn test_dag_topological_sort_simple() {
        let stages = vec![
            StageNode::new(StageId::Crawl, "Crawl", vec![], false, 1000),
            StageNode::new(StageId::Enrich, "Enrich", vec![StageId::Crawl], false, 1000),
        ];

        let dag = PipelineDAG::new(stages).unwrap();
        let order = dag.execution_order();

        assert_eq!(order.len(), 2);
        assert_eq!(order[0], vec![StageId::Crawl]);
        assert_eq!(order[1], vec![StageId::Enrich]);
    }

    #[test]
    fn test_dag_ingestion_pipeline_is_sequential() {
        let dag = PipelineDAG::ingestion_pipeline().unwrap();
        let order = dag.execution_order();

        assert_eq!(order.len(), 3);
        assert_eq!(order[0], vec![StageId::Crawl]);
        assert_eq!(order[1], vec![StageId::Enrich]);
        assert_eq!(order[2], vec![StageId::Materialize]);
    }

    #[test]
    fn test_dag_projection_pipeline() {
        let dag = PipelineDAG::projection_pipeline().unwrap();
        let order = dag.execution_order();

        assert_eq!(order.len(), 2);
        assert_eq!(order[0], vec![StageId::Project]);
        assert_eq!(order[1], vec![StageId::MartUpsert]);
    }

    #[test]
    fn test_dag_cycle_detection() {
        let stages = vec![StageNode::new(StageId::Enrich, "Enrich", vec![StageId::Crawl], false, 1000)];
        let result = PipelineDAG::new(stages);
        assert!(result.is_err());
    }

    #[test]
    fn test_dag_execution_plan_string() {
        let dag = PipelineDAG::ingestion_pipeline().unwrap();
        let plan = dag.execution_plan();

        assert!(plan.contains("Phase 1:"));
        assert!(plan.contains("Crawl PR list"));
    }

    #[test]
    fn test_dag_required_cache_keys() {
        let dag = PipelineDAG::ingestion_pipeline().unwrap();
        let mgr = CacheKeyManager::new("acme/widgets".to_string());

        let crawl_keys = dag.required_cache_keys(StageId::Crawl, &mgr);
        assert_eq!(crawl_keys.len(), 0);

        let enrich_keys = dag.required_cache_keys(StageId::Enrich, &mgr);
        assert_eq!(enrich_keys.len(), 1);
        assert_eq!(enrich_keys[0], "crawl:acme/widgets");

        let materialize_keys = dag.required_cache_keys(StageId::Materialize, &mgr);
        assert_eq!(materialize_keys.len(), 1);
        assert_eq!(materialize_keys[0], "enrich:acme/widgets");
    }
}

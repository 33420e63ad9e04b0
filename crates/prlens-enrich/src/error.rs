use thiserror::Error;

/// IngestSkip (spec §7): any fatal per-PR error is carried as this variant,
/// logged, and the PR is skipped rather than aborting the whole ingest.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("forge error while enriching PR #{number}: {source}")]
    Forge { number: u64, #[source] source: prlens_forge::ForgeError },
}

pub type Result<T> = std::result::Result<T, EnrichError>;

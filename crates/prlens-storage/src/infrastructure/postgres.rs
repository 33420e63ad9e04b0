//! PostgreSQL-backed `RelationalMart` adapter (spec §4.5). Batches of 50
//! rows per table, transactional; a failed batch rolls back and falls back
//! to per-row upsert so one bad row never drops the rest of the batch.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

use crate::domain::mart::{AuthorFileOwnership, AuthorMetricsDaily, AuthorMetricsWindow, AuthorPrsWindow, AuthorRow, RepoPr};
use crate::domain::RelationalMart;
use crate::error::StorageError;
use crate::Result;

const BATCH_SIZE: usize = 50;

pub struct PostgresMart {
    pool: PgPool,
}

impl PostgresMart {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await.map_err(StorageError::from)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Runs `batch` for every chunk of up to `BATCH_SIZE` rows inside one
/// transaction; on failure, rolls back and retries the chunk one row at a
/// time via `single`, logging and skipping any row that still fails.
async fn upsert_batched<T, F, Fut, G, Gut>(pool: &PgPool, rows: &[T], batch: F, single: G) -> Result<()>
where
    T: Clone,
    F: Fn(Transaction<'static, Postgres>, &[T]) -> Fut,
    Fut: std::future::Future<Output = sqlx::Result<Transaction<'static, Postgres>>>,
    G: Fn(Transaction<'static, Postgres>, &T) -> Gut,
    Gut: std::future::Future<Output = sqlx::Result<Transaction<'static, Postgres>>>,
{
    for chunk in rows.chunks(BATCH_SIZE) {
        let tx = pool.begin().await.map_err(StorageError::from)?;
        match batch(tx, chunk).await {
            Ok(tx) => {
                tx.commit().await.map_err(StorageError::from)?;
            }
            Err(e) => {
                warn!(error = %e, batch_size = chunk.len(), "mart batch upsert failed, falling back to per-row");
                for row in chunk {
                    let tx = pool.begin().await.map_err(StorageError::from)?;
                    match single(tx, row).await {
                        Ok(tx) => {
                            tx.commit().await.map_err(StorageError::from)?;
                        }
                        Err(e) => warn!(error = %e, "per-row mart upsert failed, skipping row"),
                    }
                }
            }
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl RelationalMart for PostgresMart {
    async fn upsert_authors(&self, rows: &[AuthorRow]) -> Result<()> {
        upsert_batched(
            &self.pool,
            rows,
            |mut tx, chunk| async move {
                for row in chunk {
                    upsert_author(&mut tx, row).await?;
                }
                Ok(tx)
            },
            |mut tx, row| async move {
                upsert_author(&mut tx, row).await?;
                Ok(tx)
            },
        )
        .await
    }

    async fn upsert_daily_metrics(&self, rows: &[AuthorMetricsDaily]) -> Result<()> {
        upsert_batched(
            &self.pool,
            rows,
            |mut tx, chunk| async move {
                for row in chunk {
                    upsert_daily(&mut tx, row).await?;
                }
                Ok(tx)
            },
            |mut tx, row| async move {
                upsert_daily(&mut tx, row).await?;
                Ok(tx)
            },
        )
        .await
    }

    async fn upsert_window_metrics(&self, rows: &[AuthorMetricsWindow]) -> Result<()> {
        upsert_batched(
            &self.pool,
            rows,
            |mut tx, chunk| async move {
                for row in chunk {
                    upsert_window(&mut tx, row).await?;
                }
                Ok(tx)
            },
            |mut tx, row| async move {
                upsert_window(&mut tx, row).await?;
                Ok(tx)
            },
        )
        .await
    }

    async fn upsert_file_ownership(&self, rows: &[AuthorFileOwnership]) -> Result<()> {
        upsert_batched(
            &self.pool,
            rows,
            |mut tx, chunk| async move {
                for row in chunk {
                    upsert_ownership(&mut tx, row).await?;
                }
                Ok(tx)
            },
            |mut tx, row| async move {
                upsert_ownership(&mut tx, row).await?;
                Ok(tx)
            },
        )
        .await
    }

    async fn upsert_prs_window(&self, rows: &[AuthorPrsWindow]) -> Result<()> {
        upsert_batched(
            &self.pool,
            rows,
            |mut tx, chunk| async move {
                for row in chunk {
                    upsert_prs_window_row(&mut tx, row).await?;
                }
                Ok(tx)
            },
            |mut tx, row| async move {
                upsert_prs_window_row(&mut tx, row).await?;
                Ok(tx)
            },
        )
        .await
    }

    async fn upsert_repo_prs(&self, rows: &[RepoPr]) -> Result<()> {
        upsert_batched(
            &self.pool,
            rows,
            |mut tx, chunk| async move {
                for row in chunk {
                    upsert_repo_pr(&mut tx, row).await?;
                }
                Ok(tx)
            },
            |mut tx, row| async move {
                upsert_repo_pr(&mut tx, row).await?;
                Ok(tx)
            },
        )
        .await
    }

    async fn truncate_aggregates(&self, repo_name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        for table in ["author_metrics_daily", "author_metrics_window", "author_file_ownership", "author_prs_window"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE repo_name = $1"))
                .bind(repo_name)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }
}

async fn upsert_author(tx: &mut Transaction<'_, Postgres>, row: &AuthorRow) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO authors (username, display_name, avatar_url) VALUES ($1, $2, $3)
         ON CONFLICT (username) DO UPDATE SET display_name = EXCLUDED.display_name, avatar_url = EXCLUDED.avatar_url, updated_at = now()",
    )
    .bind(&row.username)
    .bind(&row.display_name)
    .bind(&row.avatar_url)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_daily(tx: &mut Transaction<'_, Postgres>, row: &AuthorMetricsDaily) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO author_metrics_daily
            (username, repo_name, day, prs_submitted, prs_merged, lines_changed, high_risk_prs, features_merged)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (username, repo_name, day) DO UPDATE SET
            prs_submitted = EXCLUDED.prs_submitted,
            prs_merged = EXCLUDED.prs_merged,
            lines_changed = EXCLUDED.lines_changed,
            high_risk_prs = EXCLUDED.high_risk_prs,
            features_merged = EXCLUDED.features_merged,
            updated_at = now()",
    )
    .bind(&row.username)
    .bind(&row.repo_name)
    .bind(row.day)
    .bind(row.prs_submitted as i32)
    .bind(row.prs_merged as i32)
    .bind(row.lines_changed as i64)
    .bind(row.high_risk_prs as i32)
    .bind(row.features_merged as i32)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_window(tx: &mut Transaction<'_, Postgres>, row: &AuthorMetricsWindow) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO author_metrics_window
            (username, repo_name, window_days, start_date, end_date, prs_submitted, prs_merged,
             high_risk_prs, high_risk_rate, lines_changed, ownership_low_risk_prs)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (username, repo_name, window_days, start_date, end_date) DO UPDATE SET
            prs_submitted = EXCLUDED.prs_submitted,
            prs_merged = EXCLUDED.prs_merged,
            high_risk_prs = EXCLUDED.high_risk_prs,
            high_risk_rate = EXCLUDED.high_risk_rate,
            lines_changed = EXCLUDED.lines_changed,
            ownership_low_risk_prs = EXCLUDED.ownership_low_risk_prs,
            updated_at = now()",
    )
    .bind(&row.username)
    .bind(&row.repo_name)
    .bind(row.window_days as i32)
    .bind(row.start_date)
    .bind(row.end_date)
    .bind(row.prs_submitted as i32)
    .bind(row.prs_merged as i32)
    .bind(row.high_risk_prs as i32)
    .bind(row.high_risk_rate)
    .bind(row.lines_changed as i64)
    .bind(row.ownership_low_risk_prs as i32)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_ownership(tx: &mut Transaction<'_, Postgres>, row: &AuthorFileOwnership) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO author_file_ownership
            (username, repo_name, window_days, start_date, end_date, file_id, file_path,
             ownership_pct, author_lines, total_lines, last_touched)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (username, repo_name, window_days, start_date, end_date, file_id) DO UPDATE SET
            ownership_pct = EXCLUDED.ownership_pct,
            author_lines = EXCLUDED.author_lines,
            total_lines = EXCLUDED.total_lines,
            last_touched = EXCLUDED.last_touched,
            updated_at = now()",
    )
    .bind(&row.username)
    .bind(&row.repo_name)
    .bind(row.window_days as i32)
    .bind(row.start_date)
    .bind(row.end_date)
    .bind(&row.file_id)
    .bind(&row.file_path)
    .bind(row.ownership_pct)
    .bind(row.author_lines as i64)
    .bind(row.total_lines as i64)
    .bind(row.last_touched)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_prs_window_row(tx: &mut Transaction<'_, Postgres>, row: &AuthorPrsWindow) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO author_prs_window
            (username, repo_name, window_days, start_date, end_date, pr_number, title, pr_summary,
             merged_at, risk_score, high_risk, feature_rule, feature_confidence)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         ON CONFLICT (username, repo_name, window_days, start_date, end_date, pr_number) DO UPDATE SET
            title = EXCLUDED.title,
            pr_summary = EXCLUDED.pr_summary,
            merged_at = EXCLUDED.merged_at,
            risk_score = EXCLUDED.risk_score,
            high_risk = EXCLUDED.high_risk,
            feature_rule = EXCLUDED.feature_rule,
            feature_confidence = EXCLUDED.feature_confidence,
            updated_at = now()",
    )
    .bind(&row.username)
    .bind(&row.repo_name)
    .bind(row.window_days as i32)
    .bind(row.start_date)
    .bind(row.end_date)
    .bind(row.pr_number as i64)
    .bind(&row.title)
    .bind(&row.pr_summary)
    .bind(row.merged_at)
    .bind(row.risk_score)
    .bind(row.high_risk)
    .bind(&row.feature_rule)
    .bind(row.feature_confidence)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_repo_pr(tx: &mut Transaction<'_, Postgres>, row: &RepoPr) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO repo_prs
            (repo_name, pr_number, title, pr_summary, author, created_at, merged_at, is_merged,
             additions, deletions, changed_files, labels_full, feature_rule, feature_confidence,
             risk_score, high_risk, risk_reasons, top_risky_files)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
         ON CONFLICT (repo_name, pr_number) DO UPDATE SET
            title = EXCLUDED.title,
            pr_summary = EXCLUDED.pr_summary,
            author = EXCLUDED.author,
            merged_at = EXCLUDED.merged_at,
            is_merged = EXCLUDED.is_merged,
            additions = EXCLUDED.additions,
            deletions = EXCLUDED.deletions,
            changed_files = EXCLUDED.changed_files,
            labels_full = EXCLUDED.labels_full,
            feature_rule = EXCLUDED.feature_rule,
            feature_confidence = EXCLUDED.feature_confidence,
            risk_score = EXCLUDED.risk_score,
            high_risk = EXCLUDED.high_risk,
            risk_reasons = EXCLUDED.risk_reasons,
            top_risky_files = EXCLUDED.top_risky_files,
            updated_at = now()",
    )
    .bind(&row.repo_name)
    .bind(row.pr_number as i64)
    .bind(&row.title)
    .bind(&row.pr_summary)
    .bind(&row.author)
    .bind(row.created_at)
    .bind(row.merged_at)
    .bind(row.is_merged)
    .bind(row.additions as i32)
    .bind(row.deletions as i32)
    .bind(row.changed_files as i32)
    .bind(&row.labels_full)
    .bind(&row.feature_rule)
    .bind(row.feature_confidence)
    .bind(row.risk_score)
    .bind(row.high_risk)
    .bind(&row.risk_reasons)
    .bind(&row.top_risky_files)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

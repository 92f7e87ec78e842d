use async_trait::async_trait;

use hanbot_core::{RunRecord, LAST_RUN_KEY};

use super::{RepositoryError, RunInfoRepository};
use crate::DbPool;

pub struct SqlRunInfoRepository {
    pool: DbPool,
}

impl SqlRunInfoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunInfoRepository for SqlRunInfoRepository {
    async fn last_run(&self) -> Result<Option<String>, RepositoryError> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT CAST(val AS TEXT) FROM info WHERE name = ?1 LIMIT 1")
                .bind(LAST_RUN_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten())
    }

    async fn record_run(&self, timestamp: &str) -> Result<RunRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // `info` has no key constraint in older databases, so no upsert.
        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT CAST(val AS TEXT) FROM info WHERE name = ?1 LIMIT 1")
                .bind(LAST_RUN_KEY)
                .fetch_optional(&mut *tx)
                .await?;

        let record = match previous {
            Some(previous) => {
                sqlx::query("UPDATE info SET val = ?1 WHERE name = ?2")
                    .bind(timestamp)
                    .bind(LAST_RUN_KEY)
                    .execute(&mut *tx)
                    .await?;
                RunRecord::Repeat { previous: previous.unwrap_or_default() }
            }
            None => {
                sqlx::query("INSERT INTO info (name, val) VALUES (?1, ?2)")
                    .bind(LAST_RUN_KEY)
                    .bind(timestamp)
                    .execute(&mut *tx)
                    .await?;
                RunRecord::FirstRun
            }
        };

        tx.commit().await?;
        Ok(record)
    }
}

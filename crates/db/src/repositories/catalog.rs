use async_trait::async_trait;
use sqlx::Row;

use hanbot_core::CommandEntry;

use super::{CommandCatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCommandCatalogRepository {
    pool: DbPool,
}

impl SqlCommandCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommandCatalogRepository for SqlCommandCatalogRepository {
    async fn list(&self) -> Result<Vec<CommandEntry>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT CAST(prompt AS TEXT) AS prompt, CAST("use" AS TEXT) AS usage,
                      CAST(example AS TEXT) AS example
               FROM commands
               ORDER BY rowid ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let text = |column: &str| -> Result<String, RepositoryError> {
                    row.try_get::<Option<String>, _>(column)
                        .map(Option::unwrap_or_default)
                        .map_err(|e| RepositoryError::Decode(e.to_string()))
                };
                Ok(CommandEntry {
                    prompt: text("prompt")?,
                    usage: text("usage")?,
                    example: text("example")?,
                })
            })
            .collect()
    }
}

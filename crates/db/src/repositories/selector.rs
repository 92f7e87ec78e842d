use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use hanbot_core::{run_timestamp, ContentFilter, ContentTable, SelectedContent};

use super::{ContentSelector, RepositoryError};
use crate::StoragePools;

/// Physical table and content column behind each rotating table. `rowid`
/// is the row key so databases without an explicit id column still work.
pub(crate) fn table_layout(table: ContentTable) -> (&'static str, &'static str) {
    match table {
        ContentTable::Jokes => ("jokes", "joke"),
        ContentTable::Restaurants => ("restaurants", "name"),
        ContentTable::Bandito => ("bandito", "response"),
    }
}

pub struct SqlContentSelector {
    pools: StoragePools,
}

impl SqlContentSelector {
    pub fn new(pools: StoragePools) -> Self {
        Self { pools }
    }
}

#[async_trait]
impl ContentSelector for SqlContentSelector {
    async fn select_and_consume(
        &self,
        table: ContentTable,
        filter: Option<&ContentFilter>,
    ) -> Result<Option<SelectedContent>, RepositoryError> {
        let (table_name, column) = table_layout(table);
        let pool = self.pools.pool(table.store());
        let mut tx = pool.begin().await?;

        let where_clause = match filter {
            Some(ContentFilter::ContentEquals(_)) => format!("WHERE {column} = ?1"),
            None => String::new(),
        };
        let select = format!(
            "SELECT rowid AS id, CAST({column} AS TEXT) AS content, used
             FROM {table_name}
             {where_clause}
             ORDER BY used ASC, RANDOM()
             LIMIT 1"
        );
        let mut query = sqlx::query(&select);
        if let Some(ContentFilter::ContentEquals(value)) = filter {
            query = query.bind(value.as_str());
        }

        let Some(row) = query.fetch_optional(&mut *tx).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let content: Option<String> =
            row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let used: i64 = row.try_get("used").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        if table == ContentTable::Restaurants {
            sqlx::query(
                "UPDATE restaurants SET used = used + 1, last_visit = ?1 WHERE rowid = ?2",
            )
            .bind(run_timestamp(Utc::now()))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(&format!("UPDATE {table_name} SET used = used + 1 WHERE rowid = ?1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(SelectedContent { table, id, content: content.unwrap_or_default(), used: used + 1 }))
    }
}

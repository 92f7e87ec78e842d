use hanbot_core::ContentTable;

use crate::repositories::selector::table_layout;
use crate::repositories::RepositoryError;
use crate::StoragePools;

/// Deterministic demo content for local development: a handful of jokes,
/// a lunch list, and canned bandito responses. Loading is idempotent.
pub struct SeedDataset;

impl SeedDataset {
    pub const JOKES_SQL: &str = include_str!("../../../config/fixtures/jokes_seed.sql");
    pub const FUNCTIONS_SQL: &str = include_str!("../../../config/fixtures/functions_seed.sql");

    pub const JOKE_COUNT: i64 = 5;
    pub const RESTAURANT_COUNT: i64 = 4;
    pub const BANDITO_COUNT: i64 = 3;

    pub async fn load(pools: &StoragePools) -> Result<SeedResult, RepositoryError> {
        let before = row_counts(pools).await?;

        let mut tx = pools.jokes.begin().await?;
        sqlx::raw_sql(Self::JOKES_SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        let mut tx = pools.functions.begin().await?;
        sqlx::raw_sql(Self::FUNCTIONS_SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        let after = row_counts(pools).await?;
        let inserted = after
            .iter()
            .zip(&before)
            .map(|(after, before)| TableCount { table: after.table, rows: after.rows - before.rows })
            .collect();

        Ok(SeedResult { inserted })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: i64,
}

#[derive(Debug)]
pub struct SeedResult {
    pub inserted: Vec<TableCount>,
}

impl SeedResult {
    pub fn total_inserted(&self) -> i64 {
        self.inserted.iter().map(|count| count.rows).sum()
    }
}

/// Row counts for every bot table, jokes database first.
pub async fn row_counts(pools: &StoragePools) -> Result<Vec<TableCount>, RepositoryError> {
    let mut counts = Vec::with_capacity(4);
    for table in ContentTable::ALL {
        let (table_name, _) = table_layout(table);
        counts.push(count_rows(pools, table, table_name).await?);
        if table == ContentTable::Restaurants {
            let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commands")
                .fetch_one(&pools.functions)
                .await?;
            counts.push(TableCount { table: "commands", rows });
        }
    }
    Ok(counts)
}

async fn count_rows(
    pools: &StoragePools,
    table: ContentTable,
    table_name: &'static str,
) -> Result<TableCount, RepositoryError> {
    let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table_name}"))
        .fetch_one(pools.pool(table.store()))
        .await?;
    Ok(TableCount { table: table_name, rows })
}

use sqlx::migrate::{MigrateError, Migrator};

use crate::{DbPool, StoragePools};

pub static JOKES_MIGRATOR: Migrator = sqlx::migrate!("../../migrations/jokes");
pub static FUNCTIONS_MIGRATOR: Migrator = sqlx::migrate!("../../migrations/functions");

pub async fn run_jokes(pool: &DbPool) -> Result<(), MigrateError> {
    JOKES_MIGRATOR.run(pool).await
}

pub async fn run_functions(pool: &DbPool) -> Result<(), MigrateError> {
    FUNCTIONS_MIGRATOR.run(pool).await
}

pub async fn run_pending(pools: &StoragePools) -> Result<(), MigrateError> {
    run_jokes(&pools.jokes).await?;
    run_functions(&pools.functions).await
}

#[cfg(test)]
mod tests {
    use super::{run_pending, FUNCTIONS_MIGRATOR, JOKES_MIGRATOR};
    use crate::{DbPool, StoragePools};

    async fn table_names(pool: &DbPool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations'
             ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .expect("list tables")
    }

    #[tokio::test]
    async fn each_database_gets_only_its_own_tables() {
        let pools = StoragePools::in_memory().await.expect("connect");
        run_pending(&pools).await.expect("run migrations");

        assert_eq!(table_names(&pools.jokes).await, vec!["info", "jokes"]);
        assert_eq!(table_names(&pools.functions).await, vec!["bandito", "commands", "restaurants"]);
    }

    #[tokio::test]
    async fn functions_migration_seeds_one_help_row_per_trigger() {
        let pools = StoragePools::in_memory().await.expect("connect");
        run_pending(&pools).await.expect("run migrations");

        let prompts: Vec<String> = sqlx::query_scalar("SELECT prompt FROM commands ORDER BY id")
            .fetch_all(&pools.functions)
            .await
            .expect("load prompts");

        assert_eq!(
            prompts,
            vec!["joke", "!help", "!lunchsuggest", "!lunchadd", "!lunchdel", "!lunchlist", "!gtfo"]
        );
    }

    #[tokio::test]
    async fn rerunning_migrations_is_a_no_op() {
        let pools = StoragePools::in_memory().await.expect("connect");
        run_pending(&pools).await.expect("first run");
        run_pending(&pools).await.expect("second run");

        let commands: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commands")
            .fetch_one(&pools.functions)
            .await
            .expect("count commands");
        assert_eq!(commands, 7);
    }

    #[tokio::test]
    async fn existing_tables_from_older_deployments_are_adopted() {
        let pools = StoragePools::in_memory().await.expect("connect");
        sqlx::query("CREATE TABLE jokes (id INTEGER PRIMARY KEY, joke TEXT, used INTEGER)")
            .execute(&pools.jokes)
            .await
            .expect("create legacy table");
        sqlx::query("INSERT INTO jokes (joke, used) VALUES ('legacy', 4)")
            .execute(&pools.jokes)
            .await
            .expect("insert legacy row");

        run_pending(&pools).await.expect("run migrations");

        let used: i64 = sqlx::query_scalar("SELECT used FROM jokes WHERE joke = 'legacy'")
            .fetch_one(&pools.jokes)
            .await
            .expect("legacy row survives");
        assert_eq!(used, 4);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pools = StoragePools::in_memory().await.expect("connect");
        run_pending(&pools).await.expect("run migrations");

        JOKES_MIGRATOR.undo(&pools.jokes, 0).await.expect("undo jokes");
        FUNCTIONS_MIGRATOR.undo(&pools.functions, 0).await.expect("undo functions");

        assert!(table_names(&pools.jokes).await.is_empty());
        assert!(table_names(&pools.functions).await.is_empty());

        run_pending(&pools).await.expect("re-run migrations");
        assert_eq!(table_names(&pools.jokes).await, vec!["info", "jokes"]);
    }
}

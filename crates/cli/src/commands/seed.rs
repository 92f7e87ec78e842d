use crate::commands::{open_or_create, run_with_config, CommandResult, Failure};
use hanbot_db::{migrations, SeedDataset, TableCount};

pub fn run() -> CommandResult {
    run_with_config("seed", |config| async move {
        let pools = open_or_create(&config).await?;
        migrations::run_pending(&pools)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let loaded = SeedDataset::load(&pools).await;
        pools.close().await;
        let result = loaded.map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        Ok::<_, Failure>(format!(
            "seed dataset loaded: {} new rows ({})",
            result.total_inserted(),
            describe_counts(&result.inserted)
        ))
    })
}

fn describe_counts(counts: &[TableCount]) -> String {
    counts.iter().map(|count| format!("{}: {}", count.table, count.rows)).collect::<Vec<_>>().join(", ")
}

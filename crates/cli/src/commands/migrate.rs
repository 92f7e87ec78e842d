use crate::commands::{open_or_create, run_with_config, CommandResult, Failure};
use hanbot_db::migrations;

pub fn run() -> CommandResult {
    run_with_config("migrate", |config| async move {
        let pools = open_or_create(&config).await?;
        migrations::run_pending(&pools)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pools.close().await;

        Ok::<_, Failure>(format!(
            "applied pending migrations to `{}` and `{}`",
            config.database.jokes_path.display(),
            config.database.functions_path.display()
        ))
    })
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use hanbot_core::config::{AppConfig, ConfigError};
use hanbot_db::{connect_file, migrations, repositories::BotRepositories, DbPool, StoragePools};
use hanbot_slack::{
    bot_dispatcher, start_session, BotSession, CommandRouter, HttpSlackWebApi, ReconnectPolicy,
    SessionError, SlackWebApi, SocketModeRunner, WebSocketTransport,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub pools: StoragePools,
    pub repositories: BotRepositories,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{label} database not found at `{path}`; run `hanbot-admin migrate` to create it")]
    MissingDatabase { label: &'static str, path: PathBuf },
    #[error("{label} database connection failed: {source}")]
    DatabaseConnect {
        label: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("{label} database migration failed: {source}")]
    Migration {
        label: &'static str,
        #[source]
        source: sqlx::migrate::MigrateError,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        bot_name = %config.bot.name,
        "starting application bootstrap"
    );
    config.validate()?;

    let jokes = open_existing("jokes", &config.database.jokes_path, &config).await?;
    let functions = open_existing("functions", &config.database.functions_path, &config).await?;

    migrations::run_jokes(&jokes)
        .await
        .map_err(|source| BootstrapError::Migration { label: "jokes", source })?;
    migrations::run_functions(&functions)
        .await
        .map_err(|source| BootstrapError::Migration { label: "functions", source })?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let pools = StoragePools::new(jokes, functions);
    let repositories = BotRepositories::sql(&pools);
    Ok(Application { config, pools, repositories })
}

/// The bot never creates its databases; a missing file is fatal.
async fn open_existing(
    label: &'static str,
    path: &Path,
    config: &AppConfig,
) -> Result<DbPool, BootstrapError> {
    if !path.is_file() {
        return Err(BootstrapError::MissingDatabase { label, path: path.to_path_buf() });
    }

    let pool = connect_file(
        path,
        false,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|source| BootstrapError::DatabaseConnect { label, source })?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        database = label,
        path = %path.display(),
        "database connection established"
    );
    Ok(pool)
}

/// Opens the Slack session and wires the socket runner to the router.
pub async fn start_bot(
    app: &Application,
) -> Result<(BotSession, SocketModeRunner), BootstrapError> {
    let web: Arc<dyn SlackWebApi> =
        Arc::new(HttpSlackWebApi::new(app.config.slack.bot_token.clone()));
    let session = start_session(
        web.as_ref(),
        app.repositories.run_info.as_ref(),
        &app.config.bot.name,
        Utc::now(),
    )
    .await?;

    let router = CommandRouter::new(web, app.repositories.clone(), session.identity.clone());
    let transport = Arc::new(WebSocketTransport::new(app.config.slack.app_token.clone()));
    let runner =
        SocketModeRunner::new(transport, bot_dispatcher(router), ReconnectPolicy::default());

    Ok((session, runner))
}

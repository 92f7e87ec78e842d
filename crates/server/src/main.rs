mod bootstrap;
mod health;

use anyhow::Result;
use hanbot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use hanbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.pools.clone(),
    )
    .await?;

    let (session, runner) = bootstrap::start_bot(&app).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bot_user_id = %session.identity.user_id,
        "hanbot started"
    );

    tokio::select! {
        result = runner.start() => {
            result?;
            tracing::warn!(
                event_name = "system.server.runner_stopped",
                correlation_id = "shutdown",
                "socket mode runner stopped"
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "hanbot stopping"
    );
    app.pools.close().await;

    Ok(())
}

pub mod doctor;
pub mod migrate;
pub mod seed;

use std::future::Future;
use std::path::Path;

use hanbot_core::config::{AppConfig, ConfigError, LoadOptions};
use hanbot_db::{connect_file, StoragePools};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Failure triple carried out of async command bodies:
/// `(error_class, message, exit_code)`.
pub(crate) type Failure = (&'static str, String, u8);

pub(crate) fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::load(LoadOptions::default())
}

/// Loads config and runs `body` on a fresh current-thread runtime, mapping
/// each failure stage onto the shared exit codes.
pub(crate) fn run_with_config<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = Result<String, Failure>>,
{
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(body(config)) {
        Ok(message) => CommandResult::success(command, message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

/// Opens both databases, creating the files (and parent directories) when
/// they do not exist yet.
pub(crate) async fn open_or_create(config: &AppConfig) -> Result<StoragePools, Failure> {
    let jokes = open_file(&config.database.jokes_path, config).await?;
    let functions = open_file(&config.database.functions_path, config).await?;
    Ok(StoragePools::new(jokes, functions))
}

async fn open_file(path: &Path, config: &AppConfig) -> Result<hanbot_db::DbPool, Failure> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|error| {
            ("db_connectivity", format!("cannot create `{}`: {error}", parent.display()), 4u8)
        })?;
    }
    connect_file(path, true, config.database.max_connections, config.database.timeout_secs)
        .await
        .map_err(|error| {
            ("db_connectivity", format!("cannot open `{}`: {error}", path.display()), 4u8)
        })
}

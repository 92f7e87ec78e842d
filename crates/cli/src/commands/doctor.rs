use std::path::Path;

use hanbot_core::config::AppConfig;
use hanbot_db::{connect_file, row_counts, DbPool, StoragePools};
use serde::Serialize;

use crate::commands::{load_config, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code is 0 only when every check passes.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match load_config() {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!("configuration loaded for bot `{}`", config.bot.name),
            });
            checks.extend(check_databases(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["jokes_database", "functions_database", "table_rows"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_databases(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let details = format!("failed to initialize async runtime: {error}");
            return ["jokes_database", "functions_database", "table_rows"]
                .into_iter()
                .map(|name| DoctorCheck { name, status: CheckStatus::Fail, details: details.clone() })
                .collect();
        }
    };

    runtime.block_on(async {
        let jokes = open_existing(&config.database.jokes_path, config).await;
        let functions = open_existing(&config.database.functions_path, config).await;

        let mut checks = vec![
            connectivity_check("jokes_database", &config.database.jokes_path, &jokes),
            connectivity_check("functions_database", &config.database.functions_path, &functions),
        ];

        let rows = match (jokes, functions) {
            (Ok(jokes), Ok(functions)) => {
                let pools = StoragePools::new(jokes, functions);
                let counted = row_counts(&pools).await;
                pools.close().await;
                match counted {
                    Ok(counts) => DoctorCheck {
                        name: "table_rows",
                        status: CheckStatus::Pass,
                        details: counts
                            .iter()
                            .map(|count| format!("{}={}", count.table, count.rows))
                            .collect::<Vec<_>>()
                            .join(" "),
                    },
                    Err(error) => DoctorCheck {
                        name: "table_rows",
                        status: CheckStatus::Fail,
                        details: format!("{error} (run `hanbot-admin migrate`)"),
                    },
                }
            }
            (jokes, functions) => {
                for pool in [jokes, functions].into_iter().flatten() {
                    pool.close().await;
                }
                DoctorCheck {
                    name: "table_rows",
                    status: CheckStatus::Skipped,
                    details: "skipped because a database is unavailable".to_string(),
                }
            }
        };
        checks.push(rows);
        checks
    })
}

async fn open_existing(path: &Path, config: &AppConfig) -> Result<DbPool, String> {
    if !path.is_file() {
        return Err(format!("`{}` does not exist (run `hanbot-admin migrate`)", path.display()));
    }
    connect_file(path, false, config.database.max_connections, config.database.timeout_secs)
        .await
        .map_err(|error| format!("failed to open `{}`: {error}", path.display()))
}

fn connectivity_check(
    name: &'static str,
    path: &Path,
    outcome: &Result<DbPool, String>,
) -> DoctorCheck {
    match outcome {
        Ok(_) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("connected to `{}`", path.display()),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: error.clone() },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use hanbot_db::{DbPool, StoragePools};
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    pools: StoragePools,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub jokes_database: HealthCheck,
    pub functions_database: HealthCheck,
    pub checked_at: String,
}

pub fn router(pools: StoragePools) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { pools })
}

pub async fn spawn(bind_address: &str, port: u16, pools: StoragePools) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(pools)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let jokes_database = database_check(&state.pools.jokes).await;
    let functions_database = database_check(&state.pools.functions).await;
    let ready = jokes_database.status == "ready" && functions_database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck { status: "ready", detail: "hanbot runtime initialized".to_string() },
        jokes_database,
        functions_database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use hanbot_db::StoragePools;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_both_databases_are_reachable() {
        let pools = StoragePools::in_memory().await.expect("pools should connect");

        let (status, Json(payload)) = health(State(HealthState { pools: pools.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.jokes_database.status, "ready");
        assert_eq!(payload.functions_database.status, "ready");

        pools.close().await;
    }

    #[tokio::test]
    async fn health_degrades_when_one_database_is_unavailable() {
        let pools = StoragePools::in_memory().await.expect("pools should connect");
        pools.functions.close().await;

        let (status, Json(payload)) = health(State(HealthState { pools })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.jokes_database.status, "ready");
        assert_eq!(payload.functions_database.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}

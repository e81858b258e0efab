use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use timeclock_core::calendar::WallClock;
use timeclock_db::{ping, DbPool};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    clock: WallClock,
    scheduler_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_error: Option<String>,
    pub alert_scheduler: &'static str,
    /// Attendance wall-clock time, the clock punches and alerts are judged by.
    pub local_time: String,
}

pub fn router(db_pool: DbPool, clock: WallClock, scheduler_enabled: bool) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { db_pool, clock, scheduler_enabled })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database_error = ping(&state.db_pool).await.err().map(|error| error.to_string());
    let ready = database_error.is_none();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database: if ready { "ready" } else { "unreachable" },
        database_error,
        alert_scheduler: if state.scheduler_enabled { "running" } else { "disabled" },
        local_time: state.clock.now().format("%Y-%m-%dT%H:%M:%S").to_string(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

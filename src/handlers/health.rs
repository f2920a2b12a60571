use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::state::AppState;

/// Health check endpoint reporting database and cache reachability.
#[axum::debug_handler]
pub async fn health(State(mut state): State<AppState>) -> impl IntoResponse {
    let db_ok = match state.db.get().await {
        Ok(client) => client.simple_query("SELECT 1").await.is_ok(),
        Err(_) => false,
    };

    let redis_ok = redis::cmd("PING")
        .query_async::<String>(&mut state.redis)
        .await
        .is_ok();

    let status = if db_ok && redis_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(sonic_rs::json!({
            "status": if db_ok && redis_ok { "ok" } else { "degraded" },
            "database": db_ok,
            "cache": redis_ok,
        })),
    )
}

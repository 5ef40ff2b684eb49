use axum::{extract::State, http::StatusCode, Json};
use crate::services::ServiceHealthStatus;
use crate::state::AppState;

/// 200 while the database answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ServiceHealthStatus>) {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        for issue in status.get_issues() {
            tracing::warn!(issue = %issue, "Health check issue");
        }
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

//! Result endpoints, leaderboard and spreadsheet import/export

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use crate::handlers::{form_field, xlsx_download, UploadForm};
use crate::middleware::{Authenticated, MaybeAuthenticated};
use crate::models::Page;
use crate::models::registration::{BulkIdsRequest, BulkOutcome};
use crate::models::result::{
    CompetitionResult, CreateResultRequest, ImportSummary, LeaderboardQuery, ResultExportQuery, ResultFilter,
    UpdateResultRequest,
};
use crate::services::results::import_status;
use crate::services::spreadsheet::export_filename;
use crate::state::AppState;
use crate::utils::errors::{Result, SportsHubError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_results).post(create_result))
        .route("/leaderboard", get(leaderboard))
        .route("/my_results", get(my_results))
        .route("/pending_results_count", get(pending_results_count))
        .route("/export", get(export))
        .route("/import", post(import))
        .route("/bulk_publish", post(bulk_publish))
        .route("/bulk_delete", post(bulk_delete))
        .route("/:id", get(get_result).put(update_result).patch(update_result).delete(delete_result))
        .route("/:id/publish", put(publish))
        .route("/:id/unpublish", put(unpublish))
}

#[derive(Debug, Serialize)]
pub struct PendingCount {
    pub count: i64,
}

async fn list_results(
    State(state): State<AppState>,
    auth: MaybeAuthenticated,
    Query(filter): Query<ResultFilter>,
) -> Result<Json<Page<CompetitionResult>>> {
    Ok(Json(state.services.results.list(auth.ctx(), &filter).await?))
}

async fn get_result(State(state): State<AppState>, auth: MaybeAuthenticated, Path(id): Path<i64>) -> Result<Json<CompetitionResult>> {
    Ok(Json(state.services.results.get_visible(auth.ctx(), id).await?))
}

async fn create_result(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateResultRequest>,
) -> Result<(StatusCode, Json<CompetitionResult>)> {
    let result = state.services.results.create(auth.ctx(), &request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn update_result(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateResultRequest>,
) -> Result<Json<CompetitionResult>> {
    Ok(Json(state.services.results.update(auth.ctx(), id, &request).await?))
}

async fn delete_result(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.results.delete(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<CompetitionResult>> {
    Ok(Json(state.services.results.set_published(auth.ctx(), id, true).await?))
}

async fn unpublish(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<CompetitionResult>> {
    Ok(Json(state.services.results.set_published(auth.ctx(), id, false).await?))
}

async fn bulk_publish(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<BulkIdsRequest>,
) -> Result<Json<BulkOutcome>> {
    Ok(Json(state.services.results.bulk_publish(auth.ctx(), &request.ids).await?))
}

async fn bulk_delete(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<BulkIdsRequest>,
) -> Result<Json<BulkOutcome>> {
    Ok(Json(state.services.results.bulk_delete(auth.ctx(), &request.ids).await?))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<CompetitionResult>>> {
    Ok(Json(state.services.results.leaderboard(query.event, query.round_type).await?))
}

async fn my_results(State(state): State<AppState>, auth: Authenticated) -> Result<Json<Vec<CompetitionResult>>> {
    Ok(Json(state.services.results.my_results(auth.ctx()).await?))
}

async fn pending_results_count(State(state): State<AppState>, auth: Authenticated) -> Result<Json<PendingCount>> {
    let count = state.services.results.pending_results_count(auth.ctx()).await?;
    Ok(Json(PendingCount { count }))
}

async fn export(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<ResultExportQuery>,
) -> Result<Response> {
    let bytes = state.services.results.export(auth.ctx(), query.event, query.round_type).await?;
    Ok(xlsx_download(bytes, &export_filename("results", Utc::now())))
}

/// 201 when every row imported, 200 when some failed, 400 when none did
async fn import(
    State(state): State<AppState>,
    auth: Authenticated,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImportSummary>)> {
    let (file, fields) = UploadForm::read(multipart, &["file"]).await?.require_file()?;
    let context_event = form_field(&fields, "context_event")
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| SportsHubError::invalid(format!("Invalid context_event: {}", raw)))
        })
        .transpose()?;

    let summary = state.services.results.import(auth.ctx(), file.bytes, context_event).await?;
    Ok((import_status(&summary), Json(summary)))
}

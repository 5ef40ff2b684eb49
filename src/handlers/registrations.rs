//! Registration endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use crate::handlers::xlsx_download;
use crate::middleware::Authenticated;
use crate::models::Page;
use crate::models::registration::{
    BulkIdsRequest, BulkOutcome, BulkReviewRequest, CreateRegistrationRequest, ParticipantDetails, Registration,
    RegistrationExportQuery, RegistrationFilter, ReviewRequest,
};
use crate::services::spreadsheet::export_filename;
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_registrations).post(create_registration))
        .route("/my_registrations", get(my_registrations))
        .route("/export", get(export))
        .route("/bulk_approve", post(bulk_approve))
        .route("/bulk_reject", post(bulk_reject))
        .route("/bulk_delete", post(bulk_delete))
        .route(
            "/:id",
            get(get_registration).patch(update_registration).delete(delete_registration),
        )
        .route("/:id/approve", put(approve))
        .route("/:id/reject", put(reject))
        .route("/:id/cancel", put(cancel))
}

async fn list_registrations(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(filter): Query<RegistrationFilter>,
) -> Result<Json<Page<Registration>>> {
    Ok(Json(state.services.registrations.list(auth.ctx(), &filter).await?))
}

async fn create_registration(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<Registration>)> {
    let registration = state.services.registrations.create(auth.ctx(), &request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn get_registration(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Registration>> {
    Ok(Json(state.services.registrations.get_visible(auth.ctx(), id).await?))
}

async fn update_registration(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(details): Json<ParticipantDetails>,
) -> Result<Json<Registration>> {
    Ok(Json(state.services.registrations.update_details(auth.ctx(), id, &details).await?))
}

async fn delete_registration(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.registrations.delete(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn approve(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    review: Option<Json<ReviewRequest>>,
) -> Result<Json<Registration>> {
    let remarks = review.and_then(|Json(r)| r.review_remarks);
    Ok(Json(state.services.registrations.approve(auth.ctx(), id, remarks.as_deref()).await?))
}

async fn reject(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    review: Option<Json<ReviewRequest>>,
) -> Result<Json<Registration>> {
    let remarks = review.and_then(|Json(r)| r.review_remarks);
    Ok(Json(state.services.registrations.reject(auth.ctx(), id, remarks.as_deref()).await?))
}

async fn cancel(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Registration>> {
    Ok(Json(state.services.registrations.cancel(auth.ctx(), id).await?))
}

async fn my_registrations(State(state): State<AppState>, auth: Authenticated) -> Result<Json<Vec<Registration>>> {
    Ok(Json(state.services.registrations.mine(auth.ctx()).await?))
}

async fn export(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<RegistrationExportQuery>,
) -> Result<Response> {
    let bytes = state.services.registrations.export(auth.ctx(), query.event, query.status).await?;
    Ok(xlsx_download(bytes, &export_filename("registrations", Utc::now())))
}

async fn bulk_approve(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<BulkReviewRequest>,
) -> Result<Json<BulkOutcome>> {
    let outcome = state
        .services
        .registrations
        .bulk_review(auth.ctx(), &request.ids, true, request.review_remarks.as_deref())
        .await?;
    Ok(Json(outcome))
}

async fn bulk_reject(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<BulkReviewRequest>,
) -> Result<Json<BulkOutcome>> {
    let outcome = state
        .services
        .registrations
        .bulk_review(auth.ctx(), &request.ids, false, request.review_remarks.as_deref())
        .await?;
    Ok(Json(outcome))
}

async fn bulk_delete(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<BulkIdsRequest>,
) -> Result<Json<BulkOutcome>> {
    Ok(Json(state.services.registrations.bulk_delete(auth.ctx(), &request.ids).await?))
}

//! Event endpoints, referee assignments and referee event access

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use crate::handlers::UploadForm;
use crate::middleware::Authenticated;
use crate::models::Page;
use crate::models::announcement::Announcement;
use crate::models::event::{
    AssignRefereeEventsRequest, AssignmentFilter, CreateAssignmentRequest, CreateEventRequest, EventAssignment,
    EventDetail, EventFilter, EventView, RefereeEventAccess, UpdateAssignmentRequest, UpdateEventRequest,
};
use crate::models::registration::Registration;
use crate::models::result::CompetitionResult;
use crate::services::events::UploadedImage;
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/featured", get(featured))
        .route("/upcoming", get(upcoming))
        .route("/ongoing", get(ongoing))
        .route("/can_register", get(can_register))
        .route("/upload_image", post(upload_image))
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route(
            "/assignments/:id",
            get(get_assignment).put(update_assignment).patch(update_assignment).delete(delete_assignment),
        )
        .route("/referee_access", get(list_access))
        .route("/referee_access/assign", post(assign_access))
        .route("/referee_access/my_events", get(my_events))
        .route("/:id", get(get_event).put(update_event).patch(update_event).delete(delete_event))
        .route("/:id/click", post(click))
        .route("/:id/registrations", get(event_registrations))
        .route("/:id/results", get(event_results))
        .route("/:id/announcements", get(event_announcements))
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    pub view_count: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccessQuery {
    pub referee: Option<i64>,
}

async fn list_events(State(state): State<AppState>, Query(filter): Query<EventFilter>) -> Result<Json<Page<EventView>>> {
    Ok(Json(state.services.events.list(&filter, Utc::now()).await?))
}

async fn get_event(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<EventDetail>> {
    Ok(Json(state.services.events.detail(id, Utc::now()).await?))
}

async fn create_event(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventView>)> {
    let event = state.services.events.create(auth.ctx(), &request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventView>> {
    Ok(Json(state.services.events.update(auth.ctx(), id, &request, Utc::now()).await?))
}

async fn delete_event(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.events.delete(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn click(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ClickResponse>> {
    let view_count = state.services.events.click(id).await?;
    Ok(Json(ClickResponse { view_count }))
}

async fn featured(State(state): State<AppState>) -> Result<Json<Vec<EventView>>> {
    Ok(Json(state.services.events.featured(Utc::now()).await?))
}

async fn upcoming(State(state): State<AppState>) -> Result<Json<Vec<EventView>>> {
    Ok(Json(state.services.events.upcoming(Utc::now()).await?))
}

async fn ongoing(State(state): State<AppState>) -> Result<Json<Vec<EventView>>> {
    Ok(Json(state.services.events.ongoing(Utc::now()).await?))
}

async fn can_register(State(state): State<AppState>) -> Result<Json<Vec<EventView>>> {
    Ok(Json(state.services.events.open_for_registration(Utc::now()).await?))
}

async fn event_registrations(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Registration>>> {
    Ok(Json(state.services.events.registrations(auth.ctx(), id).await?))
}

async fn event_results(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Vec<CompetitionResult>>> {
    Ok(Json(state.services.events.results(id).await?))
}

async fn event_announcements(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Vec<Announcement>>> {
    Ok(Json(state.services.events.announcements(id, Utc::now()).await?))
}

async fn upload_image(
    State(state): State<AppState>,
    auth: Authenticated,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedImage>)> {
    let (file, _) = UploadForm::read(multipart, &["file", "image"]).await?.require_file()?;

    let uploaded = state
        .services
        .events
        .upload_image(auth.ctx(), file.content_type.as_deref(), &file.bytes, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(uploaded)))
}

// Assignments

async fn list_assignments(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(filter): Query<AssignmentFilter>,
) -> Result<Json<Vec<EventAssignment>>> {
    Ok(Json(state.services.events.list_assignments(auth.ctx(), &filter).await?))
}

async fn get_assignment(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<EventAssignment>> {
    Ok(Json(state.services.events.get_assignment(auth.ctx(), id).await?))
}

async fn create_assignment(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<EventAssignment>)> {
    let assignment = state.services.events.create_assignment(auth.ctx(), &request).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update_assignment(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAssignmentRequest>,
) -> Result<Json<EventAssignment>> {
    Ok(Json(state.services.events.update_assignment(auth.ctx(), id, &request).await?))
}

async fn delete_assignment(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.events.delete_assignment(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Referee access

async fn list_access(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<AccessQuery>,
) -> Result<Json<Vec<RefereeEventAccess>>> {
    Ok(Json(state.services.events.list_access(auth.ctx(), query.referee).await?))
}

async fn assign_access(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<AssignRefereeEventsRequest>,
) -> Result<Json<Vec<RefereeEventAccess>>> {
    Ok(Json(state.services.events.assign_access(auth.ctx(), &request).await?))
}

async fn my_events(State(state): State<AppState>, auth: Authenticated) -> Result<Json<Vec<EventView>>> {
    Ok(Json(state.services.events.my_events(auth.ctx(), Utc::now()).await?))
}

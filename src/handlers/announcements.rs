//! Announcement endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use crate::middleware::{Authenticated, MaybeAuthenticated};
use crate::models::Page;
use crate::models::announcement::{
    Announcement, AnnouncementFilter, CreateAnnouncementRequest, UpdateAnnouncementRequest,
};
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements).post(create_announcement))
        .route("/published", get(published))
        .route("/pinned", get(pinned))
        .route(
            "/:id",
            get(get_announcement).put(update_announcement).patch(update_announcement).delete(delete_announcement),
        )
        .route("/:id/publish", put(publish))
        .route("/:id/unpublish", put(unpublish))
        .route("/:id/pin", put(pin))
        .route("/:id/unpin", put(unpin))
}

async fn list_announcements(
    State(state): State<AppState>,
    auth: MaybeAuthenticated,
    Query(filter): Query<AnnouncementFilter>,
) -> Result<Json<Page<Announcement>>> {
    Ok(Json(state.services.announcements.list(auth.ctx(), &filter, Utc::now()).await?))
}

async fn get_announcement(
    State(state): State<AppState>,
    auth: MaybeAuthenticated,
    Path(id): Path<i64>,
) -> Result<Json<Announcement>> {
    Ok(Json(state.services.announcements.retrieve(auth.ctx(), id, Utc::now()).await?))
}

async fn create_announcement(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>)> {
    let announcement = state.services.announcements.create(auth.ctx(), &request).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

async fn update_announcement(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>> {
    Ok(Json(state.services.announcements.update(auth.ctx(), id, &request).await?))
}

async fn delete_announcement(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.announcements.delete(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn published(State(state): State<AppState>) -> Result<Json<Vec<Announcement>>> {
    Ok(Json(state.services.announcements.published(Utc::now()).await?))
}

async fn pinned(State(state): State<AppState>) -> Result<Json<Vec<Announcement>>> {
    Ok(Json(state.services.announcements.pinned(Utc::now()).await?))
}

async fn publish(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Announcement>> {
    Ok(Json(state.services.announcements.set_published(auth.ctx(), id, true).await?))
}

async fn unpublish(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Announcement>> {
    Ok(Json(state.services.announcements.set_published(auth.ctx(), id, false).await?))
}

async fn pin(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Announcement>> {
    Ok(Json(state.services.announcements.set_pinned(auth.ctx(), id, true).await?))
}

async fn unpin(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Announcement>> {
    Ok(Json(state.services.announcements.set_pinned(auth.ctx(), id, false).await?))
}

//! Carousel slide endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use crate::middleware::{Authenticated, MaybeAuthenticated};
use crate::models::Page;
use crate::models::carousel::{Carousel, CarouselFilter, CreateCarouselRequest, PositionQuery, UpdateCarouselRequest};
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_carousels).post(create_carousel))
        .route("/active", get(active))
        .route("/by_position", get(by_position))
        .route(
            "/:id",
            get(get_carousel).put(update_carousel).patch(update_carousel).delete(delete_carousel),
        )
        .route("/:id/click", post(click))
        .route("/:id/activate", put(activate))
        .route("/:id/deactivate", put(deactivate))
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    pub click_count: i32,
}

async fn list_carousels(
    State(state): State<AppState>,
    auth: MaybeAuthenticated,
    Query(filter): Query<CarouselFilter>,
) -> Result<Json<Page<Carousel>>> {
    Ok(Json(state.services.carousel.list(auth.ctx(), &filter, Utc::now()).await?))
}

async fn get_carousel(State(state): State<AppState>, auth: MaybeAuthenticated, Path(id): Path<i64>) -> Result<Json<Carousel>> {
    Ok(Json(state.services.carousel.retrieve(auth.ctx(), id, Utc::now()).await?))
}

async fn create_carousel(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateCarouselRequest>,
) -> Result<(StatusCode, Json<Carousel>)> {
    let carousel = state.services.carousel.create(auth.ctx(), &request).await?;
    Ok((StatusCode::CREATED, Json(carousel)))
}

async fn update_carousel(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCarouselRequest>,
) -> Result<Json<Carousel>> {
    Ok(Json(state.services.carousel.update(auth.ctx(), id, &request).await?))
}

async fn delete_carousel(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.carousel.delete(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn active(State(state): State<AppState>) -> Result<Json<Vec<Carousel>>> {
    Ok(Json(state.services.carousel.live(None, Utc::now()).await?))
}

/// Live slides for one position; `home` when none is given
async fn by_position(State(state): State<AppState>, Query(query): Query<PositionQuery>) -> Result<Json<Vec<Carousel>>> {
    let position = query.position.unwrap_or_default();
    Ok(Json(state.services.carousel.live(Some(position), Utc::now()).await?))
}

async fn click(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ClickResponse>> {
    let click_count = state.services.carousel.click(id).await?;
    Ok(Json(ClickResponse { click_count }))
}

async fn activate(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Carousel>> {
    Ok(Json(state.services.carousel.set_active(auth.ctx(), id, true).await?))
}

async fn deactivate(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Carousel>> {
    Ok(Json(state.services.carousel.set_active(auth.ctx(), id, false).await?))
}

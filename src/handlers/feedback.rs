//! Feedback endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use crate::middleware::Authenticated;
use crate::models::Page;
use crate::models::feedback::{
    CreateFeedbackRequest, Feedback, FeedbackFilter, FeedbackStatistics, ReplyFeedbackRequest, UpdateFeedbackRequest,
    UpdateFeedbackStatusRequest,
};
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_feedback).post(create_feedback))
        .route("/my_feedbacks", get(my_feedbacks))
        .route("/pending", get(pending))
        .route("/statistics", get(statistics))
        .route(
            "/:id",
            get(get_feedback).put(update_feedback).patch(update_feedback).delete(delete_feedback),
        )
        .route("/:id/reply", post(reply))
        .route("/:id/update_status", put(update_status))
}

async fn list_feedback(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(filter): Query<FeedbackFilter>,
) -> Result<Json<Page<Feedback>>> {
    Ok(Json(state.services.feedback.list(auth.ctx(), &filter).await?))
}

async fn create_feedback(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateFeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>)> {
    let feedback = state.services.feedback.create(auth.ctx(), &request).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

async fn get_feedback(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Feedback>> {
    Ok(Json(state.services.feedback.get_visible(auth.ctx(), id).await?))
}

async fn update_feedback(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateFeedbackRequest>,
) -> Result<Json<Feedback>> {
    Ok(Json(state.services.feedback.update(auth.ctx(), id, &request).await?))
}

async fn delete_feedback(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.feedback.delete(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reply(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<ReplyFeedbackRequest>,
) -> Result<Json<Feedback>> {
    Ok(Json(state.services.feedback.reply(auth.ctx(), id, &request).await?))
}

async fn update_status(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateFeedbackStatusRequest>,
) -> Result<Json<Feedback>> {
    Ok(Json(state.services.feedback.update_status(auth.ctx(), id, request.status).await?))
}

async fn my_feedbacks(State(state): State<AppState>, auth: Authenticated) -> Result<Json<Vec<Feedback>>> {
    Ok(Json(state.services.feedback.mine(auth.ctx()).await?))
}

async fn pending(State(state): State<AppState>, auth: Authenticated) -> Result<Json<Vec<Feedback>>> {
    Ok(Json(state.services.feedback.pending(auth.ctx()).await?))
}

async fn statistics(State(state): State<AppState>, auth: Authenticated) -> Result<Json<FeedbackStatistics>> {
    Ok(Json(state.services.feedback.statistics(auth.ctx()).await?))
}

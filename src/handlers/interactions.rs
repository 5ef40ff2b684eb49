//! Likes, favorites and comments on polymorphic targets

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use crate::middleware::{Authenticated, MaybeAuthenticated};
use crate::models::Page;
use crate::models::interaction::{
    Comment, CommentFilter, CommentView, CreateCommentRequest, CreateFavoriteRequest, Favorite, FavoriteView,
    InteractionFilter, Like, TargetParams, UpdateCommentRequest,
};
use crate::services::wordcloud::WordWeight;
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/likes", get(list_likes).post(create_like))
        .route("/likes/unlike", post(unlike))
        .route("/likes/check", get(check_like))
        .route("/likes/:id", get(get_like).delete(delete_like))
        .route("/favorites", get(list_favorites).post(create_favorite))
        .route("/favorites/unfavorite", post(unfavorite))
        .route("/favorites/check", get(check_favorite))
        .route("/favorites/:id", get(get_favorite).delete(delete_favorite))
        .route("/comments", get(list_comments).post(create_comment))
        .route("/comments/wordcloud", get(comment_wordcloud))
        .route(
            "/comments/:id",
            get(get_comment).put(update_comment).patch(update_comment).delete(delete_comment),
        )
        .route("/comments/:id/approve", put(approve_comment))
        .route("/comments/:id/reject", put(reject_comment))
        .route("/comments/:id/like", post(like_comment))
}

#[derive(Debug, Serialize)]
pub struct LikedResponse {
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoritedResponse {
    pub favorited: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentLikeResponse {
    pub like_count: i32,
}

// Likes

async fn list_likes(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(filter): Query<InteractionFilter>,
) -> Result<Json<Page<Like>>> {
    Ok(Json(state.services.interactions.list_likes(auth.ctx(), &filter).await?))
}

async fn create_like(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(params): Json<TargetParams>,
) -> Result<(StatusCode, Json<Like>)> {
    let like = state.services.interactions.like(auth.ctx(), &params).await?;
    Ok((StatusCode::CREATED, Json(like)))
}

async fn unlike(State(state): State<AppState>, auth: Authenticated, Json(params): Json<TargetParams>) -> Result<StatusCode> {
    state.services.interactions.unlike(auth.ctx(), &params).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_like(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(params): Query<TargetParams>,
) -> Result<Json<LikedResponse>> {
    let liked = state.services.interactions.has_liked(auth.ctx(), &params).await?;
    Ok(Json(LikedResponse { liked }))
}

async fn get_like(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Like>> {
    Ok(Json(state.services.interactions.get_like(auth.ctx(), id).await?))
}

async fn delete_like(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.interactions.delete_like(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Favorites

async fn list_favorites(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(filter): Query<InteractionFilter>,
) -> Result<Json<Page<FavoriteView>>> {
    Ok(Json(state.services.interactions.list_favorites(auth.ctx(), &filter).await?))
}

async fn create_favorite(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateFavoriteRequest>,
) -> Result<(StatusCode, Json<Favorite>)> {
    let favorite = state.services.interactions.favorite(auth.ctx(), &request).await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

async fn unfavorite(State(state): State<AppState>, auth: Authenticated, Json(params): Json<TargetParams>) -> Result<StatusCode> {
    state.services.interactions.unfavorite(auth.ctx(), &params).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_favorite(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(params): Query<TargetParams>,
) -> Result<Json<FavoritedResponse>> {
    let favorited = state.services.interactions.has_favorited(auth.ctx(), &params).await?;
    Ok(Json(FavoritedResponse { favorited }))
}

async fn get_favorite(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Favorite>> {
    Ok(Json(state.services.interactions.get_favorite(auth.ctx(), id).await?))
}

async fn delete_favorite(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.interactions.delete_favorite(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Comments

async fn list_comments(
    State(state): State<AppState>,
    auth: MaybeAuthenticated,
    Query(filter): Query<CommentFilter>,
) -> Result<Json<Page<Comment>>> {
    Ok(Json(state.services.interactions.list_comments(auth.ctx(), &filter).await?))
}

async fn get_comment(State(state): State<AppState>, auth: MaybeAuthenticated, Path(id): Path<i64>) -> Result<Json<CommentView>> {
    Ok(Json(state.services.interactions.get_comment(auth.ctx(), id).await?))
}

async fn create_comment(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = state.services.interactions.create_comment(auth.ctx(), &request).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>> {
    Ok(Json(state.services.interactions.update_comment(auth.ctx(), id, &request).await?))
}

async fn delete_comment(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.interactions.delete_comment(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn approve_comment(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Comment>> {
    Ok(Json(state.services.interactions.set_comment_approved(auth.ctx(), id, true).await?))
}

async fn reject_comment(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<Comment>> {
    Ok(Json(state.services.interactions.set_comment_approved(auth.ctx(), id, false).await?))
}

async fn like_comment(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<CommentLikeResponse>> {
    let like_count = state.services.interactions.like_comment(id).await?;
    Ok(Json(CommentLikeResponse { like_count }))
}

async fn comment_wordcloud(State(state): State<AppState>) -> Json<Vec<WordWeight>> {
    Json(state.services.interactions.wordcloud().as_ref().clone())
}

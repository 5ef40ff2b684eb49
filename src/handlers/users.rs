//! Account and token endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use crate::handlers::Message;
use crate::middleware::Authenticated;
use crate::models::Page;
use crate::models::registration::Registration;
use crate::models::result::CompetitionResult;
use crate::models::user::{ChangePasswordRequest, RegisterUserRequest, UpdateUserRequest, User, UserFilter};
use crate::services::auth::{Claims, Permission, LoginRequest, RefreshRequest, TokenPair, VerifyRequest};
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/update_profile", axum::routing::put(update_profile).patch(update_profile))
        .route("/change_password", post(change_password))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
        .route("/:id/registrations", get(user_registrations))
        .route("/:id/results", get(user_results))
}

/// Token endpoints; they carry credentials in the body and never read the
/// `Authorization` header, so a stale access token cannot block a refresh
pub fn token_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/verify", post(verify))
}

pub fn auth_router() -> Router<AppState> {
    Router::new().route("/logout", post(logout))
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

async fn register(State(state): State<AppState>, Json(request): Json<RegisterUserRequest>) -> Result<(StatusCode, Json<User>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let (user, tokens) = state.services.users.login(&request).await?;
    Ok(Json(LoginResponse { user, tokens }))
}

async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> Result<Json<TokenPair>> {
    Ok(Json(state.services.users.refresh(&request.refresh).await?))
}

async fn verify(State(state): State<AppState>, Json(request): Json<VerifyRequest>) -> Result<Json<Claims>> {
    Ok(Json(state.services.users.verify(&request.token).await?))
}

async fn logout(State(state): State<AppState>, auth: Authenticated) -> Result<Json<Message>> {
    state.services.users.logout(&auth.0.claims).await?;
    Ok(Json(Message::new("Logged out")))
}

async fn me(State(state): State<AppState>, auth: Authenticated) -> Result<Json<User>> {
    Ok(Json(state.services.users.get(auth.ctx().user_id).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let ctx = auth.ctx();
    Ok(Json(state.services.users.update_profile(ctx, ctx.user_id, request).await?))
}

async fn change_password(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Message>> {
    state.services.users.change_password(auth.ctx().user_id, &request).await?;
    Ok(Json(Message::new("Password changed")))
}

async fn list_users(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Page<User>>> {
    Ok(Json(state.services.users.list(auth.ctx(), &filter).await?))
}

async fn get_user(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<Json<User>> {
    Ok(Json(state.services.users.get_visible(auth.ctx(), id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    auth.ctx().require(Permission::Admin)?;
    Ok(Json(state.services.users.update_profile(auth.ctx(), id, request).await?))
}

async fn delete_user(State(state): State<AppState>, auth: Authenticated, Path(id): Path<i64>) -> Result<StatusCode> {
    state.services.users.delete(auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn user_registrations(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Registration>>> {
    Ok(Json(state.services.registrations.for_user(auth.ctx(), id).await?))
}

async fn user_results(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CompetitionResult>>> {
    Ok(Json(state.services.results.for_user(auth.ctx(), id).await?))
}

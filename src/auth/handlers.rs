use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, SignupRequest, UserResponse},
        extractors::AuthUser,
        services,
    },
    error::AppError,
    state::AppState,
    users::repo_types::ProfileUpdate,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user/me", get(get_me).put(update_me))
}

/// Turns axum's JSON rejection (422/415) into a plain 400.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        AppError::Validation(e.body_text())
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let req = body(payload)?;
    let (user, token) = services::register(
        state.store.as_ref(),
        &state.jwt,
        &req.name,
        &req.email,
        &req.password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let req = body(payload)?;
    let (user, token) =
        services::authenticate(state.store.as_ref(), &state.jwt, &req.email, &req.password)
            .await?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

#[instrument(skip(state, claims), fields(user_id = %claims.id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::current_user(state.store.as_ref(), &claims).await?;
    Ok(Json(UserResponse { user: user.into() }))
}

#[instrument(skip(state, claims, payload), fields(user_id = %claims.id))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let update = body(payload)?;
    let user = services::update_profile(state.store.as_ref(), &claims, update).await?;
    Ok(Json(UserResponse { user: user.into() }))
}

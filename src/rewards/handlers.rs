use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use super::services;
use crate::{
    auth::extractors::AuthUser, error::AppError, state::AppState,
    users::repo_types::PublicUser,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatusResponse {
    pub claimable: bool,
    pub points: i64,
    pub current_streak: i32,
    pub next_streak: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_date: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub user: PublicUser,
    pub points_awarded: i64,
    pub new_streak: i32,
}

pub fn reward_routes() -> Router<AppState> {
    Router::new()
        .route("/rewards/daily", get(daily_status))
        .route("/rewards/daily/claim", post(claim_daily))
}

#[instrument(skip(state, claims), fields(user_id = %claims.id))]
pub async fn daily_status(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<DailyStatusResponse>, AppError> {
    let (user, preview) = services::daily_status(
        state.store.as_ref(),
        &claims,
        OffsetDateTime::now_utc(),
        &state.config.rewards,
    )
    .await?;

    Ok(Json(DailyStatusResponse {
        claimable: preview.claimable,
        points: preview.points,
        current_streak: preview.current_streak,
        next_streak: preview.next_streak,
        last_login_date: user.last_login_date,
    }))
}

#[instrument(skip(state, claims), fields(user_id = %claims.id))]
pub async fn claim_daily(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ClaimResponse>, AppError> {
    let claim = services::claim_daily(
        state.store.as_ref(),
        &claims,
        OffsetDateTime::now_utc(),
        &state.config.rewards,
    )
    .await?;

    Ok(Json(ClaimResponse {
        user: claim.user.into(),
        points_awarded: claim.points_awarded,
        new_streak: claim.new_streak,
    }))
}

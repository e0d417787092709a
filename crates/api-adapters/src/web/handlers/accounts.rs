//! Registration and token issue. These routes sit outside the auth gate.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::{AccessToken, Credentials, User};

use crate::web::error::ApiError;
use crate::web::extract::JsonBody;
use crate::web::AppState;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.accounts.register(credentials).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn token(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<AccessToken>, ApiError> {
    Ok(Json(state.accounts.login(credentials).await?))
}

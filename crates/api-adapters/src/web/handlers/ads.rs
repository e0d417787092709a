//! `/api/v1/ads` handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use domains::{Ad, AdId, AdInput, AdListQuery, RawBody};

use crate::dto::PageResponse;
use crate::web::error::ApiError;
use crate::web::extract::{path_id, CurrentUser, JsonBody, QueryParams};
use crate::web::AppState;

pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AdListQuery>,
) -> Result<Json<PageResponse<Ad>>, ApiError> {
    let (filter, page) = query.parse(state.page_size)?;
    let ads = state.ads.list(&filter, page).await?;
    Ok(Json(ads.into()))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(body): JsonBody<RawBody>,
) -> Result<(StatusCode, Json<Ad>), ApiError> {
    let ad = state.ads.create(user, body.decode::<AdInput>()?).await?;
    Ok((StatusCode::CREATED, Json(ad)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ad>, ApiError> {
    let id: AdId = path_id("Ad", &id)?;
    Ok(Json(state.ads.get(id).await?))
}

pub async fn replace(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RawBody>,
) -> Result<Json<Ad>, ApiError> {
    let id: AdId = path_id("Ad", &id)?;
    Ok(Json(state.ads.replace(user, id, body).await?))
}

pub async fn patch(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RawBody>,
) -> Result<Json<Ad>, ApiError> {
    let id: AdId = path_id("Ad", &id)?;
    Ok(Json(state.ads.patch(user, id, body).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: AdId = path_id("Ad", &id)?;
    state.ads.delete(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

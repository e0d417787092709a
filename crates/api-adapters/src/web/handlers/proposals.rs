//! `/api/v1/proposals` handlers. Every operation is scoped to the caller's
//! participation, which the service enforces.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use domains::{Proposal, ProposalId, ProposalInput, ProposalListQuery, RawBody};

use crate::web::error::ApiError;
use crate::web::extract::{path_id, CurrentUser, JsonBody, QueryParams};
use crate::web::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    QueryParams(query): QueryParams<ProposalListQuery>,
) -> Result<Json<Vec<Proposal>>, ApiError> {
    let filter = query.parse()?;
    Ok(Json(state.proposals.list(user, &filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(body): JsonBody<RawBody>,
) -> Result<(StatusCode, Json<Proposal>), ApiError> {
    let proposal = state
        .proposals
        .create(user, body.decode::<ProposalInput>()?)
        .await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Proposal>, ApiError> {
    let id: ProposalId = path_id("Proposal", &id)?;
    Ok(Json(state.proposals.get(user, id).await?))
}

/// Serves both PUT and PATCH; only `status` is read from the body, and only
/// after the caller is known to be a participant.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RawBody>,
) -> Result<Json<Proposal>, ApiError> {
    let id: ProposalId = path_id("Proposal", &id)?;
    Ok(Json(state.proposals.update_status(user, id, body).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ProposalId = path_id("Proposal", &id)?;
    state.proposals.delete(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

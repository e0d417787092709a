//! Request extractors and the authentication gate.

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use domains::{AppError, UserId};

use super::error::ApiError;
use super::AppState;

/// Identity resolved by [`require_auth`], available to protected handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

/// `Json` whose rejections come back as 400 validation errors.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::invalid("body", rejection.body_text()).into()),
        }
    }
}

/// `Query` whose rejections come back as 400 validation errors naming the
/// offending parameter.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                Err(AppError::invalid(&rejected_param(&message), message).into())
            }
        }
    }
}

/// serde quotes the parameter in backticks, e.g. "duplicate field `page`".
fn rejected_param(message: &str) -> String {
    message
        .split('`')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or("query")
        .to_owned()
}

/// Path ids that do not parse point at nothing, so they read as 404.
pub fn path_id<T: FromStr>(entity: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| AppError::not_found(entity, raw).into())
}

fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| {
            AppError::Unauthorized("authentication credentials were not provided".into())
        })?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".into()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".into()))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized("expected a bearer token".into()));
    }
    Ok(token.to_owned())
}

/// Runs before any handler extractor, so unauthenticated requests never reach
/// body validation.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let user = state.accounts.authenticate(&token).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

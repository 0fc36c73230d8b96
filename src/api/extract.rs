//! Request extractors: authentication and envelope-aware body/query/path parsing.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::db::{Role, User};
use crate::services::ServiceError;
use crate::state::AppState;

/// Runs a blocking service call off the async runtime.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(AppState) -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    let expose = *state.expose_errors();
    let cloned = state.clone();
    tokio::task::spawn_blocking(move || f(cloned))
        .await
        .map_err(ServiceError::from)
        .and_then(|result| result)
        .map_err(|e| ApiError::new(e, expose))
}

/// Reads `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// The authenticated caller. Rejects with 401 without a token, 403 for a bad
/// token and 404 when the account is gone.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            ApiError::new(
                ServiceError::unauthenticated("Access token required"),
                *state.expose_errors(),
            )
        })?;
        let user = blocking(state, move |s| s.accounts().authenticate(&token)).await?;
        debug!(user_id = user.id(), "Request authenticated");
        Ok(Self(user))
    }
}

/// An authenticated caller with the admin role; otherwise 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        let expose = *state.expose_errors();
        if user.parse_role().map_err(|e| ApiError::new(e.into(), expose))? != Role::Admin {
            warn!(user_id = user.id(), "Admin route refused");
            return Err(ApiError::new(
                ServiceError::forbidden("Admin access required"),
                expose,
            ));
        }
        Ok(Self(user))
    }
}

/// The caller if a valid token was sent; never rejects.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(AuthUser(user)) => Ok(Self(Some(user))),
            Err(_) => Ok(Self(None)),
        }
    }
}

/// The raw bearer token, if any; never rejects.
#[derive(Debug, Clone)]
pub struct BearerToken(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        Ok(Self(bearer_token(&parts.headers)))
    }
}

/// JSON body; malformed input yields a 400 envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| ServiceError::bad_request(rejection.body_text()).into())
    }
}

/// Query string; malformed input yields a 400 envelope.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| ServiceError::bad_request(rejection.body_text()).into())
    }
}

/// Numeric id path segment; anything else yields a 400 envelope.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i32);

impl<S: Send + Sync> FromRequestParts<S> for IdPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        Path::<i32>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| Self(id))
            .map_err(|_| ServiceError::bad_request("Invalid id").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}

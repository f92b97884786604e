use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Numeric user id taken from `/users/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

pub(crate) fn parse_user_id(segment: &str) -> Option<i64> {
    lazy_static! {
        static ref ID_RE: Regex = Regex::new(r"^\d+$").unwrap();
    }
    if !ID_RE.is_match(segment) {
        return None;
    }
    segment.parse().ok()
}

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // malformed ids are reported like unknown ones
        let Path(segment) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found("invalid user id"))?;
        let id = parse_user_id(&segment).ok_or_else(|| {
            debug!(segment = %segment, "non-numeric user id");
            ApiError::not_found(format!("invalid user id: {segment}"))
        })?;
        Ok(UserId(id))
    }
}

/// JSON object body decoded regardless of `Content-Type`; every failure,
/// including a non-object document, is a 400.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            warn!(error = %e, "cannot read request body");
            ApiError::bad_request(format!("cannot read body: {e}"))
        })?;
        let invalid = |e: serde_json::Error| {
            warn!(error = %e, "invalid json body");
            ApiError::bad_request(format!("invalid data: {e}"))
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(invalid)?;
        if !value.is_object() {
            warn!("json body is not an object");
            return Err(ApiError::bad_request("invalid data: expected a JSON object"));
        }
        serde_json::from_value(value).map(JsonBody).map_err(invalid)
    }
}

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::errors::ApiError;

/// ApiJson
///
/// `Json<T>` whose rejection is an `ApiError`, so a missing content type or an
/// unparsable body answers with the usual `{"error": ...}` body instead of axum's
/// plain-text rejection.
///
/// ```ignore
/// async fn login(ApiJson(payload): ApiJson<LoginRequest>) -> Result<..., ApiError> { .. }
/// ```
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.inspect_err(|e| {
            tracing::debug!("rejected JSON body: {}", e.body_text());
        })?;
        Ok(ApiJson(value))
    }
}

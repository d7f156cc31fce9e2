//! JSON request bodies
//!
//! [`AppJson`] wraps axum's `Json` extractor so that malformed or incomplete
//! bodies are rendered as an [`AppError`] (400) instead of axum's plain-text
//! rejection.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, OptionalFromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use super::AppError;

/// JSON body extractor with [`AppError`] rejections.
///
/// Wrapped in `Option`, a request without a JSON content type yields `None`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T, S> OptionalFromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let body = <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(body.map(|Json(value)| AppJson(value)))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

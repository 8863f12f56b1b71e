//! API key extractor for protected routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the configured API key. Add it as a
/// handler argument to protect a route.
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(provided) = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            warn!("missing API key in request");
            return Err(ApiError::MissingApiKey);
        };

        if bool::from(provided.as_bytes().ct_eq(state.api_key.as_bytes())) {
            Ok(Self)
        } else {
            warn!("invalid API key provided");
            Err(ApiError::InvalidApiKey)
        }
    }
}

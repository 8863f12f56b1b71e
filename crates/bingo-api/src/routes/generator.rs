//! Routes for ticket generation, verification and subcard lookup.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bingo_core::error::DomainError;
use bingo_generation::application::command_handlers::GenerationReport;
use bingo_generation::domain::commands::{GenerateTickets, VerifySubcard};
use bingo_generation::domain::fingerprint::{Fingerprint, FingerprintRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::ApiKey;
use crate::error::ApiError;
use crate::state::AppState;

fn default_round_count() -> u32 {
    5
}

/// Request body for POST /generate.
#[derive(Deserialize)]
pub struct GenerateRequest {
    /// Event the tickets belong to.
    pub event_id: String,
    /// Global seed.
    pub seed: String,
    /// Number of tickets.
    #[serde(alias = "total_cards")]
    pub ticket_count: u32,
    /// Rounds per ticket.
    #[serde(alias = "rounds", default = "default_round_count")]
    pub round_count: u32,
}

/// Response body for POST /generate.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Always `"ok"` on success.
    pub status: &'static str,
    /// The generated batch.
    #[serde(flatten)]
    pub report: GenerationReport,
}

/// Request for POST /verify, sent as a JSON body or as query parameters.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Claimed event.
    pub event_id: String,
    /// Claimed round.
    pub round_number: u32,
    /// Fingerprint printed on the ticket.
    #[serde(alias = "fingerprint")]
    pub subcard_hash: String,
}

/// Query-string form of [`VerifyRequest`]; every field is optional so a
/// JSON-only request still extracts.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    event_id: Option<String>,
    round_number: Option<u32>,
    #[serde(alias = "fingerprint")]
    subcard_hash: Option<String>,
}

impl VerifyQuery {
    fn into_request(self) -> Result<VerifyRequest, DomainError> {
        match (self.event_id, self.round_number, self.subcard_hash) {
            (Some(event_id), Some(round_number), Some(subcard_hash)) => Ok(VerifyRequest {
                event_id,
                round_number,
                subcard_hash,
            }),
            _ => Err(DomainError::InvalidArgument(
                "event_id, round_number and subcard_hash are required".to_owned(),
            )),
        }
    }
}

/// Response body for POST /verify.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Whether the fingerprint was issued for this event and round.
    pub is_valid: bool,
    /// Echo of the claimed event.
    pub event_id: String,
    /// Echo of the claimed round.
    pub round: u32,
}

/// POST /generate
#[instrument(skip(state, request), fields(event_id = %request.event_id))]
async fn generate(
    _key: ApiKey,
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let command = GenerateTickets {
        correlation_id: Uuid::new_v4(),
        event_id: request.event_id,
        seed: request.seed,
        ticket_count: request.ticket_count,
        round_count: request.round_count,
    };

    info!(
        correlation_id = %command.correlation_id,
        ticket_count = command.ticket_count,
        round_count = command.round_count,
        "handling generate_tickets command"
    );

    // Generation is CPU-bound; keep it off the async workers.
    let engine = state.engine.clone();
    let report = tokio::task::spawn_blocking(move || engine.generate(&command))
        .await
        .map_err(|e| DomainError::Infrastructure(format!("generation task failed: {e}")))??;

    Ok(Json(GenerateResponse {
        status: "ok",
        report,
    }))
}

/// POST /verify
///
/// A JSON body takes precedence over query parameters.
#[instrument(skip_all)]
async fn verify(
    _key: ApiKey,
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    body: Option<Json<VerifyRequest>>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let request = match body {
        Some(Json(request)) => request,
        None => query.into_request()?,
    };

    let command = VerifySubcard {
        correlation_id: Uuid::new_v4(),
        event_id: request.event_id,
        round_number: request.round_number,
        fingerprint: Fingerprint::from(request.subcard_hash),
    };

    let is_valid = state.verifier.handle_verify_subcard(&command)?;

    Ok(Json(VerifyResponse {
        is_valid,
        event_id: command.event_id,
        round: command.round_number,
    }))
}

/// GET /subcards/{hash}
#[instrument(skip(state))]
async fn get_subcard(
    _key: ApiKey,
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<FingerprintRecord>, ApiError> {
    let record = state.verifier.lookup_grid(&Fingerprint::from(hash))?;
    Ok(Json(record))
}

/// Returns the router for the generator endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/verify", post(verify))
        .route("/subcards/{hash}", get(get_subcard))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bingo_generation::application::command_handlers::ExecutionMode;
    use bingo_generation::domain::qr::QrSigner;
    use bingo_test_support::fixed_clock;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    fn test_app_state() -> AppState {
        AppState::new(
            Arc::new(fixed_clock()),
            QrSigner::new("test-secret"),
            ExecutionMode::Sequential,
            KEY,
        )
    }

    fn post(uri: &str, key: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_200_with_tickets() {
        // Arrange
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({
            "event_id": "E1",
            "seed": "abc",
            "ticket_count": 3,
            "round_count": 2
        });

        // Act
        let response = app
            .oneshot(post("/generate", Some(KEY), &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["generated_count"], 6);
        assert_eq!(json["tickets"].as_array().unwrap().len(), 3);
        assert_eq!(json["tickets"][0]["rounds"][0]["grid"][2][2], "FREE");
        assert!(json.get("seed").is_none());
    }

    #[tokio::test]
    async fn test_generate_accepts_legacy_field_names_and_default_rounds() {
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({ "event_id": "E1", "seed": "abc", "total_cards": 1 });

        let response = app
            .oneshot(post("/generate", Some(KEY), &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["round_count"], 5);
        assert_eq!(json["generated_count"], 5);
    }

    #[tokio::test]
    async fn test_generate_returns_400_for_out_of_range_count() {
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({
            "event_id": "E1",
            "seed": "abc",
            "ticket_count": 0,
            "round_count": 2
        });

        let response = app
            .oneshot(post("/generate", Some(KEY), &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_generate_returns_422_for_missing_body_fields() {
        let app = router().with_state(test_app_state());

        let response = app
            .oneshot(post("/generate", Some(KEY), &serde_json::json!({})))
            .await
            .unwrap();

        // Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_missing_and_wrong_api_key_are_rejected() {
        let body = serde_json::json!({ "event_id": "E1", "round_number": 1, "subcard_hash": "x" });

        let response = router()
            .with_state(test_app_state())
            .oneshot(post("/verify", None, &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router()
            .with_state(test_app_state())
            .oneshot(post("/verify", Some("nope"), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "invalid_api_key");
    }

    #[tokio::test]
    async fn test_verify_unknown_hash_is_false_not_error() {
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({ "event_id": "E1", "round_number": 1, "subcard_hash": "x" });

        let response = app
            .oneshot(post("/verify", Some(KEY), &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["round"], 1);
    }

    #[tokio::test]
    async fn test_verify_accepts_query_parameters() {
        let state = test_app_state();
        let generated = router()
            .with_state(state.clone())
            .oneshot(post(
                "/generate",
                Some(KEY),
                &serde_json::json!({ "event_id": "E1", "seed": "q", "ticket_count": 1, "round_count": 1 }),
            ))
            .await
            .unwrap();
        let json = body_json(generated).await;
        let hash = json["tickets"][0]["rounds"][0]["fingerprint"].as_str().unwrap().to_owned();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/verify?event_id=E1&round_number=1&subcard_hash={hash}"))
            .header("x-api-key", KEY)
            .body(Body::empty())
            .unwrap();
        let response = router().with_state(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["is_valid"], true);
        assert_eq!(json["event_id"], "E1");
    }

    #[tokio::test]
    async fn test_verify_without_body_or_query_returns_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/verify?event_id=E1")
            .header("x-api-key", KEY)
            .body(Body::empty())
            .unwrap();

        let response = router()
            .with_state(test_app_state())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_get_unknown_subcard_returns_404() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .method("GET")
            .uri("/subcards/deadbeef")
            .header("x-api-key", KEY)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "not_found");
    }
}

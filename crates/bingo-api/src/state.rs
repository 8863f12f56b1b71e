//! Shared application state.

use std::sync::Arc;

use bingo_core::clock::{Clock, SystemClock};
use bingo_generation::application::command_handlers::{ExecutionMode, TicketGenerationEngine};
use bingo_generation::application::query_handlers::VerificationService;
use bingo_generation::domain::fingerprint::FingerprintIndex;
use bingo_generation::domain::qr::QrSigner;

use crate::config::AppConfig;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Batch generator.
    pub engine: Arc<TicketGenerationEngine>,
    /// Read side over the same fingerprint index.
    pub verifier: VerificationService,
    /// Expected `X-API-KEY` value.
    pub api_key: Arc<str>,
}

impl AppState {
    /// Create new application state around a fresh in-memory index.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        signer: QrSigner,
        mode: ExecutionMode,
        api_key: impl Into<Arc<str>>,
    ) -> Self {
        let index = Arc::new(FingerprintIndex::new());
        let engine = TicketGenerationEngine::new(Arc::clone(&index), signer, clock).with_mode(mode);
        Self {
            engine: Arc::new(engine),
            verifier: VerificationService::new(index),
            api_key: api_key.into(),
        }
    }

    /// Production state built from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(SystemClock),
            QrSigner::new(&config.secret_key),
            config.mode,
            config.api_key.as_str(),
        )
    }
}

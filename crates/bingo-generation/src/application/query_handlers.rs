//! Query handlers for the generation context.
//!
//! Read-only access to the fingerprint index: verification of a claimed
//! `(event, round, fingerprint)` triple and recovery of an issued grid.

use std::sync::Arc;

use bingo_core::command::Command;
use bingo_core::error::DomainError;
use tracing::{debug, info, instrument};

use crate::domain::commands::VerifySubcard;
use crate::domain::fingerprint::{Fingerprint, FingerprintIndex, FingerprintRecord};

/// Answers verification and lookup queries against a shared index.
#[derive(Debug, Clone)]
pub struct VerificationService {
    index: Arc<FingerprintIndex>,
}

impl VerificationService {
    /// Creates a service reading from `index`.
    #[must_use]
    pub fn new(index: Arc<FingerprintIndex>) -> Self {
        Self { index }
    }

    /// True iff `fingerprint` was issued for exactly this event and round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the index lock is poisoned.
    #[instrument(skip(self, fingerprint), fields(fingerprint = fingerprint.short()))]
    pub fn verify(
        &self,
        event_id: &str,
        round_number: u32,
        fingerprint: &Fingerprint,
    ) -> Result<bool, DomainError> {
        if self
            .index
            .lookup_in_scope(event_id, round_number, fingerprint)?
            .is_some()
        {
            info!("fingerprint verified");
            return Ok(true);
        }

        match self.index.lookup(fingerprint)? {
            None => debug!("unknown fingerprint"),
            Some(record) if record.event_id != event_id => {
                debug!(issued_for = %record.event_id, "fingerprint belongs to another event");
            }
            Some(record) => {
                debug!(issued_round = record.round_number, "fingerprint belongs to another round");
            }
        }
        Ok(false)
    }

    /// Handles the `VerifySubcard` command.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the index lock is poisoned.
    pub fn handle_verify_subcard(&self, command: &VerifySubcard) -> Result<bool, DomainError> {
        debug!(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            "handling verify command"
        );
        self.verify(&command.event_id, command.round_number, &command.fingerprint)
    }

    /// Recovers the record of an issued grid.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the fingerprint was never issued.
    pub fn lookup_grid(&self, fingerprint: &Fingerprint) -> Result<FingerprintRecord, DomainError> {
        self.index.lookup(fingerprint)?.ok_or_else(|| {
            debug!(fingerprint = fingerprint.short(), "lookup miss");
            DomainError::NotFound(format!("subcard {fingerprint}"))
        })
    }
}

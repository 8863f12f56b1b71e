//! Commands for the generation context.

use std::fmt;

use bingo_core::command::Command;
use bingo_core::error::DomainError;
use uuid::Uuid;

use super::fingerprint::Fingerprint;

/// Upper bound on tickets per request.
pub const MAX_TICKETS: u32 = 100_000;

/// Upper bound on rounds per ticket.
pub const MAX_ROUNDS: u32 = 10;

/// Command to generate a batch of tickets for an event.
#[derive(Clone)]
pub struct GenerateTickets {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The event the tickets belong to.
    pub event_id: String,
    /// Global seed. Never logged or returned.
    pub seed: String,
    /// Number of tickets, `1..=MAX_TICKETS`.
    pub ticket_count: u32,
    /// Rounds per ticket, `1..=MAX_ROUNDS`.
    pub round_count: u32,
}

impl GenerateTickets {
    /// Checks every field against its bound.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` naming the first offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.event_id.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "event_id must not be empty".to_owned(),
            ));
        }
        if self.seed.is_empty() {
            return Err(DomainError::InvalidArgument(
                "seed must not be empty".to_owned(),
            ));
        }
        if !(1..=MAX_TICKETS).contains(&self.ticket_count) {
            return Err(DomainError::InvalidArgument(format!(
                "ticket_count must be between 1 and {MAX_TICKETS}, got {}",
                self.ticket_count
            )));
        }
        if !(1..=MAX_ROUNDS).contains(&self.round_count) {
            return Err(DomainError::InvalidArgument(format!(
                "round_count must be between 1 and {MAX_ROUNDS}, got {}",
                self.round_count
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for GenerateTickets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateTickets")
            .field("correlation_id", &self.correlation_id)
            .field("event_id", &self.event_id)
            .field("seed", &"<redacted>")
            .field("ticket_count", &self.ticket_count)
            .field("round_count", &self.round_count)
            .finish()
    }
}

impl Command for GenerateTickets {
    fn command_type(&self) -> &'static str {
        "generation.generate_tickets"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to check a previously issued fingerprint against an event/round.
#[derive(Debug, Clone)]
pub struct VerifySubcard {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The claimed event.
    pub event_id: String,
    /// The claimed round.
    pub round_number: u32,
    /// The fingerprint printed on the ticket.
    pub fingerprint: Fingerprint,
}

impl Command for VerifySubcard {
    fn command_type(&self) -> &'static str {
        "generation.verify_subcard"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

//! Tickets: one printed card carrying a grid per round.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fingerprint::Fingerprint;
use super::grid::Grid;

/// One round's grid on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcard {
    /// Round number, 1-based.
    pub round_number: u32,
    /// Fingerprint of `grid`.
    pub fingerprint: Fingerprint,
    /// The playing surface.
    pub grid: Grid,
}

/// A complete ticket. Never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Opaque card identifier.
    pub card_id: Uuid,
    /// 1-based position within the batch.
    pub card_index: u32,
    /// Signed payload to be encoded into the ticket's QR code.
    pub qr_payload: String,
    /// Event the ticket belongs to.
    pub event_id: String,
    /// Subcards ordered by round number.
    pub rounds: Vec<Subcard>,
}

impl Ticket {
    /// Returns the subcard for `round_number`, if the ticket has one.
    #[must_use]
    pub fn round(&self, round_number: u32) -> Option<&Subcard> {
        self.rounds.iter().find(|s| s.round_number == round_number)
    }
}

//! Command handling for the generation context.
//!
//! The engine turns a `GenerateTickets` command into a batch of tickets.
//! Every `(card_index, round_number)` unit draws from its own random stream,
//! derived from the global seed and the unit's coordinates, so units can be
//! built in any order or in parallel and still produce the same grids.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bingo_core::clock::Clock;
use bingo_core::command::Command;
use bingo_core::error::DomainError;
use bingo_core::rng::SeededRng;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::commands::GenerateTickets;
use crate::domain::events::GenerationEvent;
use crate::domain::fingerprint::{FingerprintIndex, FingerprintRecord, Registration};
use crate::domain::grid::GridBuilder;
use crate::domain::qr::QrSigner;
use crate::domain::ticket::{Subcard, Ticket};

/// Marker mixed into the seed key of a unit's single collision retry.
pub const RETRY_MARKER: &str = "retry";

/// Tickets between progress log lines.
const PROGRESS_INTERVAL: u32 = 500;

/// Random stream for one unit: keyed by `"{seed}:{card_index}:{round_number}"`.
#[must_use]
pub fn unit_rng(seed: &str, card_index: u32, round_number: u32) -> SeededRng {
    SeededRng::from_key(&format!("{seed}:{card_index}:{round_number}"))
}

/// Random stream for a unit's collision retry.
#[must_use]
pub fn retry_rng(seed: &str, card_index: u32, round_number: u32) -> SeededRng {
    SeededRng::from_key(&format!("{RETRY_MARKER}:{seed}:{card_index}:{round_number}"))
}

/// How cards are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One card after another on the calling thread.
    Sequential,
    /// Cards fanned out over the rayon worker pool.
    #[default]
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(DomainError::InvalidArgument(format!(
                "unknown execution mode: {other}"
            ))),
        }
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Grids produced: `ticket_count * round_count`.
    pub generated_count: u64,
    /// Event identifier.
    pub event_id: String,
    /// Rounds per ticket.
    pub round_count: u32,
    /// Tickets produced.
    pub ticket_count: u32,
    /// Tickets ordered by `card_index`.
    pub tickets: Vec<Ticket>,
    /// Collision events, ordered by card then round.
    pub events: Vec<GenerationEvent>,
    /// When the batch completed.
    pub generated_at: DateTime<Utc>,
}

impl GenerationReport {
    /// Number of units whose retry collided as well.
    #[must_use]
    pub fn exhausted_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_exhausted()).count()
    }
}

struct BuiltTicket {
    ticket: Ticket,
    events: Vec<GenerationEvent>,
}

/// Orchestrates grid building and fingerprint registration for a batch.
pub struct TicketGenerationEngine {
    index: Arc<FingerprintIndex>,
    signer: QrSigner,
    clock: Arc<dyn Clock>,
    mode: ExecutionMode,
    // One guard per event, held from reset to the end of the batch.
    event_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for TicketGenerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketGenerationEngine")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl TicketGenerationEngine {
    /// Creates an engine over `index`, scheduling in parallel.
    #[must_use]
    pub fn new(index: Arc<FingerprintIndex>, signer: QrSigner, clock: Arc<dyn Clock>) -> Self {
        Self {
            index,
            signer,
            clock,
            mode: ExecutionMode::default(),
            event_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the scheduling mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// The index this engine registers into.
    #[must_use]
    pub fn index(&self) -> &Arc<FingerprintIndex> {
        &self.index
    }

    /// Handles the `GenerateTickets` command.
    ///
    /// Any previous issuance for the same event is discarded first, so the
    /// index reflects exactly one batch per event. Generations for the same
    /// event run one at a time; other events proceed concurrently. If the
    /// batch fails after the reset, the event is left with no issuance
    /// rather than a partial one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` before any work if the command
    /// is out of bounds, and `DomainError::Infrastructure` if the index or
    /// signer fails.
    #[instrument(skip(self, command), fields(
        correlation_id = %command.correlation_id,
        event_id = %command.event_id,
        ticket_count = command.ticket_count,
        round_count = command.round_count,
    ))]
    pub fn generate(&self, command: &GenerateTickets) -> Result<GenerationReport, DomainError> {
        command.validate()?;

        info!(command_type = command.command_type(), mode = ?self.mode, "starting generation");

        let event_lock = self.event_lock(&command.event_id)?;
        // The guard holds no data; poisoning is ignored.
        let _guard = event_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let replaced = self.index.reset_event(&command.event_id)?;
        if replaced > 0 {
            info!(replaced, "discarded previous issuance for event");
        }

        let built = match self.build_batch(command) {
            Ok(built) => built,
            Err(err) => {
                if let Err(cleanup) = self.index.reset_event(&command.event_id) {
                    warn!(error = %cleanup, "failed to roll back partial issuance");
                }
                return Err(err);
            }
        };

        let mut tickets = Vec::with_capacity(built.len());
        let mut events = Vec::new();
        for b in built {
            tickets.push(b.ticket);
            events.extend(b.events);
        }

        let report = GenerationReport {
            generated_count: u64::from(command.ticket_count) * u64::from(command.round_count),
            event_id: command.event_id.clone(),
            round_count: command.round_count,
            ticket_count: command.ticket_count,
            tickets,
            events,
            generated_at: self.clock.now(),
        };

        info!(
            generated = report.generated_count,
            exhausted = report.exhausted_count(),
            "generation complete"
        );
        Ok(report)
    }

    fn event_lock(&self, event_id: &str) -> Result<Arc<Mutex<()>>, DomainError> {
        let mut locks = self.event_locks.lock().map_err(|e| {
            DomainError::Infrastructure(format!("event lock table poisoned: {e}"))
        })?;
        Ok(Arc::clone(locks.entry(event_id.to_owned()).or_default()))
    }

    fn build_batch(&self, command: &GenerateTickets) -> Result<Vec<BuiltTicket>, DomainError> {
        let completed = AtomicU32::new(0);
        let build = |card: u32| -> Result<BuiltTicket, DomainError> {
            let built = self.build_ticket(command, card)?;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_INTERVAL == 0 {
                info!(done, total = command.ticket_count, "generation progress");
            }
            Ok(built)
        };

        match self.mode {
            ExecutionMode::Sequential => (0..command.ticket_count).map(build).collect(),
            ExecutionMode::Parallel => (0..command.ticket_count)
                .into_par_iter()
                .map(build)
                .collect(),
        }
    }

    fn build_ticket(
        &self,
        command: &GenerateTickets,
        card: u32,
    ) -> Result<BuiltTicket, DomainError> {
        let card_id = Uuid::new_v4();
        let qr_payload = self.signer.sign(&command.event_id, card_id)?;

        let mut rounds = Vec::with_capacity(command.round_count as usize);
        let mut events = Vec::new();
        for round_number in 1..=command.round_count {
            let (record, event) = self.build_unit(command, card, round_number)?;
            rounds.push(Subcard {
                round_number,
                fingerprint: record.fingerprint,
                grid: record.grid,
            });
            events.extend(event);
        }

        Ok(BuiltTicket {
            ticket: Ticket {
                card_id,
                card_index: card + 1,
                qr_payload,
                event_id: command.event_id.clone(),
                rounds,
            },
            events,
        })
    }

    // Build, register, and on collision rebuild exactly once from the retry
    // stream. A second collision is admitted and reported, never looped on.
    fn build_unit(
        &self,
        command: &GenerateTickets,
        card: u32,
        round_number: u32,
    ) -> Result<(FingerprintRecord, Option<GenerationEvent>), DomainError> {
        let event_id = command.event_id.as_str();

        let mut rng = unit_rng(&command.seed, card, round_number);
        let grid = GridBuilder::build(&mut rng, card, round_number);
        let record = FingerprintRecord::new(event_id, card + 1, round_number, grid);
        if self.index.register(record.clone())? == Registration::Accepted {
            return Ok((record, None));
        }

        warn!(
            card_index = card + 1,
            round_number,
            fingerprint = record.fingerprint.short(),
            "fingerprint collision, regenerating"
        );

        let mut rng = retry_rng(&command.seed, card, round_number);
        let grid = GridBuilder::build(&mut rng, card, round_number);
        let record = FingerprintRecord::new(event_id, card + 1, round_number, grid);
        let event = match self.index.register(record.clone())? {
            Registration::Accepted => GenerationEvent::CollisionRetried {
                event_id: event_id.to_owned(),
                card_index: card + 1,
                round_number,
                fingerprint: record.fingerprint.clone(),
            },
            Registration::Collision => {
                self.index.admit_duplicate(record.clone())?;
                warn!(
                    card_index = card + 1,
                    round_number,
                    fingerprint = record.fingerprint.short(),
                    "retry collided as well, issuing near-duplicate"
                );
                GenerationEvent::CollisionExhausted {
                    event_id: event_id.to_owned(),
                    card_index: card + 1,
                    round_number,
                    fingerprint: record.fingerprint.clone(),
                }
            }
        };
        Ok((record, Some(event)))
    }
}

//! Content fingerprints and the per-scope uniqueness index.
//!
//! Uniqueness is enforced per `(event_id, round_number)` scope. Records are
//! stored per scope as well, so two events that happen to produce the same
//! grid keep independent records; a bare-fingerprint lookup returns the
//! earliest one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use bingo_core::error::DomainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::grid::Grid;

/// SHA-256 of a grid's canonical serialization, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints a grid.
    #[must_use]
    pub fn of(grid: &Grid) -> Self {
        Self(format!("{:x}", Sha256::digest(grid.canonical().as_bytes())))
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The grouping within which fingerprints must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Event identifier.
    pub event_id: String,
    /// Round number, 1-based.
    pub round_number: u32,
}

impl Scope {
    /// Creates a scope.
    #[must_use]
    pub fn new(event_id: impl Into<String>, round_number: u32) -> Self {
        Self {
            event_id: event_id.into(),
            round_number,
        }
    }
}

/// What the index remembers about an issued grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Event the grid was issued for.
    pub event_id: String,
    /// 1-based index of the ticket carrying the grid.
    pub card_index: u32,
    /// Round the grid belongs to.
    pub round_number: u32,
    /// The grid itself.
    pub grid: Grid,
    /// Fingerprint of `grid`.
    pub fingerprint: Fingerprint,
}

impl FingerprintRecord {
    /// Builds a record, computing the fingerprint from the grid.
    #[must_use]
    pub fn new(event_id: impl Into<String>, card_index: u32, round_number: u32, grid: Grid) -> Self {
        let fingerprint = Fingerprint::of(&grid);
        Self {
            event_id: event_id.into(),
            card_index,
            round_number,
            grid,
            fingerprint,
        }
    }

    /// The scope this record belongs to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::new(self.event_id.clone(), self.round_number)
    }

    fn in_scope(&self, event_id: &str, round_number: u32) -> bool {
        self.event_id == event_id && self.round_number == round_number
    }
}

/// Outcome of [`FingerprintIndex::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The fingerprint was new to its scope and has been recorded.
    Accepted,
    /// The fingerprint already exists in the scope; nothing was changed.
    Collision,
}

type ScopeSet = Arc<Mutex<HashSet<Fingerprint>>>;

fn poisoned<T>(err: PoisonError<T>) -> DomainError {
    DomainError::Infrastructure(format!("fingerprint index lock poisoned: {err}"))
}

/// In-memory registry of issued fingerprints.
///
/// Each scope has its own mutex, so registrations in different rounds never
/// contend. The record store is written while the scope mutex is held,
/// giving at most one winner per fingerprint per scope.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    scopes: RwLock<HashMap<Scope, ScopeSet>>,
    records: RwLock<HashMap<Fingerprint, Vec<FingerprintRecord>>>,
}

impl FingerprintIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_set(&self, scope: &Scope) -> Result<ScopeSet, DomainError> {
        if let Some(set) = self.scopes.read().map_err(poisoned)?.get(scope) {
            return Ok(Arc::clone(set));
        }
        let mut scopes = self.scopes.write().map_err(poisoned)?;
        Ok(Arc::clone(scopes.entry(scope.clone()).or_default()))
    }

    // Keeps the first record per scope; later duplicates in the same scope
    // are dropped.
    fn store(&self, record: FingerprintRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let entries = records.entry(record.fingerprint.clone()).or_default();
        if !entries
            .iter()
            .any(|r| r.in_scope(&record.event_id, record.round_number))
        {
            entries.push(record);
        }
        Ok(())
    }

    /// Registers a grid in its scope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an internal lock is poisoned.
    pub fn register(&self, record: FingerprintRecord) -> Result<Registration, DomainError> {
        let set = self.scope_set(&record.scope())?;
        let mut members = set.lock().map_err(poisoned)?;
        if members.contains(&record.fingerprint) {
            return Ok(Registration::Collision);
        }
        let fingerprint = record.fingerprint.clone();
        self.store(record)?;
        members.insert(fingerprint);
        Ok(Registration::Accepted)
    }

    /// Records a grid that collided even after its retry. The scope set is
    /// unchanged (the fingerprint is already a member) and the originally
    /// stored record stays authoritative.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an internal lock is poisoned.
    pub fn admit_duplicate(&self, record: FingerprintRecord) -> Result<(), DomainError> {
        let set = self.scope_set(&record.scope())?;
        let mut members = set.lock().map_err(poisoned)?;
        let fingerprint = record.fingerprint.clone();
        self.store(record)?;
        members.insert(fingerprint);
        Ok(())
    }

    /// Returns the earliest record for `fingerprint` in any scope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an internal lock is poisoned.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<FingerprintRecord>, DomainError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .get(fingerprint)
            .and_then(|entries| entries.first())
            .cloned())
    }

    /// Returns the record for `fingerprint` within one scope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an internal lock is poisoned.
    pub fn lookup_in_scope(
        &self,
        event_id: &str,
        round_number: u32,
        fingerprint: &Fingerprint,
    ) -> Result<Option<FingerprintRecord>, DomainError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(fingerprint).and_then(|entries| {
            entries
                .iter()
                .find(|r| r.in_scope(event_id, round_number))
                .cloned()
        }))
    }

    /// Number of fingerprints registered in a scope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an internal lock is poisoned.
    pub fn scope_len(&self, scope: &Scope) -> Result<usize, DomainError> {
        let scopes = self.scopes.read().map_err(poisoned)?;
        match scopes.get(scope) {
            Some(set) => Ok(set.lock().map_err(poisoned)?.len()),
            None => Ok(0),
        }
    }

    /// Drops every scope and record belonging to `event_id`, returning how
    /// many records were removed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an internal lock is poisoned.
    pub fn reset_event(&self, event_id: &str) -> Result<usize, DomainError> {
        let mut scopes = self.scopes.write().map_err(poisoned)?;
        let mut records = self.records.write().map_err(poisoned)?;

        scopes.retain(|scope, _| scope.event_id != event_id);

        let mut removed = 0;
        records.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|r| r.event_id != event_id);
            removed += before - entries.len();
            !entries.is_empty()
        });
        Ok(removed)
    }
}

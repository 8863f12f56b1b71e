//! Observable events emitted while generating a batch.
//!
//! Collisions are not errors. A unit that collides is rebuilt once; the
//! report carries one event per unit that needed the retry.

use serde::{Deserialize, Serialize};

use super::fingerprint::Fingerprint;

/// Event type identifier for [`GenerationEvent::CollisionRetried`].
pub const COLLISION_RETRIED_EVENT_TYPE: &str = "generation.collision_retried";

/// Event type identifier for [`GenerationEvent::CollisionExhausted`].
pub const COLLISION_EXHAUSTED_EVENT_TYPE: &str = "generation.collision_exhausted";

/// Event payload variants for the generation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// The first grid collided and the retry was accepted.
    CollisionRetried {
        /// Event identifier.
        event_id: String,
        /// 1-based ticket index.
        card_index: u32,
        /// Round number.
        round_number: u32,
        /// Fingerprint of the accepted retry grid.
        fingerprint: Fingerprint,
    },
    /// Both the first grid and its retry collided. The retry grid was
    /// issued anyway and duplicates an earlier grid in its scope.
    CollisionExhausted {
        /// Event identifier.
        event_id: String,
        /// 1-based ticket index.
        card_index: u32,
        /// Round number.
        round_number: u32,
        /// The duplicated fingerprint.
        fingerprint: Fingerprint,
    },
}

impl GenerationEvent {
    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollisionRetried { .. } => COLLISION_RETRIED_EVENT_TYPE,
            Self::CollisionExhausted { .. } => COLLISION_EXHAUSTED_EVENT_TYPE,
        }
    }

    /// True for the residual-duplicate outcome.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::CollisionExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = GenerationEvent::CollisionExhausted {
            event_id: "E1".to_owned(),
            card_index: 3,
            round_number: 2,
            fingerprint: Fingerprint::from("abc"),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "collision_exhausted");
        assert_eq!(json["fingerprint"], "abc");
        assert_eq!(event.event_type(), "generation.collision_exhausted");
        assert!(event.is_exhausted());
    }
}

//! Shared test mocks and utilities for the bingo ticket generator.

mod clock;
mod rng;

pub use clock::{FixedClock, fixed_clock};
pub use rng::{MockRng, SequenceRng};

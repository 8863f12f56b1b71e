//! Bingo Core — shared abstractions.
//!
//! Holds the traits and types the generation context and the HTTP layer
//! both depend on: the clock and random source seams, the command trait
//! and the error taxonomy. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod rng;

//! Bingo ticket generator — generation & verification context.
//!
//! Builds reproducible 5×5 grids from a global seed, keeps every grid
//! unique within its `(event, round)` scope, and answers later questions
//! about issued grids by fingerprint alone.

pub mod application;
pub mod domain;

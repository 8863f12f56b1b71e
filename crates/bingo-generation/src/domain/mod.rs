//! Domain model for the generation context.

pub mod commands;
pub mod events;
pub mod fingerprint;
pub mod grid;
pub mod qr;
pub mod ticket;

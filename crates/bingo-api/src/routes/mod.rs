//! Route modules.

pub mod generator;
pub mod health;
pub mod info;

//! Application layer: command and query handling.

pub mod command_handlers;
pub mod query_handlers;

//! Application-level facade.
//!
//! # Responsibility
//! - Combine the category set with current-selection logic.
//! - Keep the CLI shell decoupled from the chosen storage backend.

pub mod state;

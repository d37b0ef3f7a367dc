//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod identify;
pub mod run_turn;

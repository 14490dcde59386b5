//! Domain layer types and invariants.

pub mod book;
pub mod error;
pub mod style;

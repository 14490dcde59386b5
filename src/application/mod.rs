//! Application services: authoring, rendering and book generation.

pub mod authoring;
pub mod books;
pub mod error;
pub mod generative;
pub mod jobs;
pub mod render;

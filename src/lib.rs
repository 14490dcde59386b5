//! Bookwright: AI-assisted book formatting and PDF publishing backend.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

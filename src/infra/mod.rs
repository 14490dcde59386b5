//! Infrastructure adapters: providers, storage, rasterizer, HTTP surface and telemetry.

pub mod error;
pub mod gemini;
pub mod http;
pub mod pdf;
pub mod storage;
pub mod telemetry;

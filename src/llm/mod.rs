//! Report generator: LLM provider client and typed response schemas.

pub mod client;
pub mod schemas;

pub use client::{Generator, DEFAULT_API_URL, DEFAULT_MODEL};
pub use schemas::*;

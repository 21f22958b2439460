//! Variant Engine and the per-card HTTP operations built on it.

pub mod engine;
pub mod handlers;

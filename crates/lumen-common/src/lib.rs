//! Common utilities for the lumen style engine.
//!
//! This crate provides shared infrastructure used by all engine components:
//! - **Warning System** - deduplicated warnings for unsupported input

pub mod warning;

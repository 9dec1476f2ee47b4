//! # veil-core
//!
//! Core types, traits, and abstractions for the veil PII screening service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other veil crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use store::JobStore;

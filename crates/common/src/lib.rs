//! Shared types used across all streambot crates.

pub mod types;

pub use types::{ChatMessage, Role};

//! Core types used throughout the crate.

pub mod chat;
pub mod config;
pub mod generation;
pub mod message;

// Re-export commonly used types
pub use chat::*;
pub use config::*;
pub use generation::*;
pub use message::*;

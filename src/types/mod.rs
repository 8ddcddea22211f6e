//! Core types used throughout the gateway.

pub mod config;
pub mod events;
pub mod request;

// Re-export commonly used types
pub use config::*;
pub use events::*;
pub use request::*;

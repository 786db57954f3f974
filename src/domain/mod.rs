//! Domain types for the admission layer.
//!
//! Core value types, configuration, and error taxonomies. Stateful
//! components (registry, ledger, engine) live at the crate root.

pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::AdmissionConfig;
pub use error::{CodecError, ConfigError, ExtractError};
pub use types::*;

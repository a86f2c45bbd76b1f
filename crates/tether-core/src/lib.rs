//! Mirror orchestration: configuration, export and import between the vector
//! store and the backup table, health-driven recovery, and scheduler wiring.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod mirror;
pub mod secret;
pub mod tasks;

pub use error::{ExportError, ImportError};
pub use secret::Secret;

//! # Careflow Core
//!
//! Shared foundation for the Careflow workspace: configuration, the error
//! taxonomy, domain types for patient records and callback-list entries, and
//! the `Store` trait that the rule handlers run against.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CareflowConfig;
pub use error::{CareflowError, Result};
pub use traits::Store;

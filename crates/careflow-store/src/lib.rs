//! # Careflow Store
//!
//! Backends for the [`Store`](careflow_core::Store) trait: the Airtable REST
//! client used in production and an in-memory store for local runs and tests.

pub mod airtable;
pub mod memory;

pub use airtable::AirtableStore;
pub use memory::MemoryStore;

//! # Careflow Rules
//!
//! The three business-rule operations behind the webhook and scheduler
//! endpoints. Each is a single read-modify-write pass over the record store:
//! a pure decision against the fetched state, then at most one store
//! mutation. No retries, no cross-record transactions — the store's own
//! per-record semantics are the only consistency guarantee.

pub mod awaken;
pub mod callback;
pub mod record_change;

pub use awaken::{SweepReport, run_awaken_sweep};
pub use callback::{SyncOutcome, sync_callback_list};
pub use record_change::{RecordAction, handle_record_change, route_record_change};

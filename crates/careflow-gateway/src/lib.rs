//! # Careflow Gateway
//!
//! Axum HTTP server exposing the three business-rule endpoints: the
//! record-change webhook, the daily awaken sweep, and the callback-list
//! sync webhook.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};

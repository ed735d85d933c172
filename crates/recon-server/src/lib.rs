//! HTTP server for Recon.
//!
//! Exposes verification, delivery and credit-note operations as a JSON API
//! and wires the services from a TOML [`ReconConfig`] once at start-up.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ReconConfig, StoreEntry, TOKEN_ENV};
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::ReconServer;
pub use state::AppState;

//! Access to the external per-store accounting ledger.
//!
//! This crate provides:
//! - the [`LedgerSource`] trait boundary used by the verification service
//! - [`HttpLedgerClient`], the production implementation over the ledger's
//!   REST query endpoint
//! - [`InMemoryLedgerSource`] for tests and embedding
//! - [`LedgerError`], which classifies every failure as network, http or
//!   parse

pub mod client;
pub mod error;
pub mod memory;
pub mod traits;

pub use client::{
    is_filter_safe, HttpLedgerClient, LedgerClientConfig, FILTER_RESERVED, TOKEN_HEADER,
};
pub use error::{ClientConfigError, LedgerError, LedgerErrorKind, LedgerResult};
pub use memory::InMemoryLedgerSource;
pub use traits::{LedgerRecord, LedgerSource, SearchOutcome};

//! Foundation types for Recon, the back-office reconciliation core.
//!
//! This crate provides the identifiers, entities, ledger mappings and
//! verification verdicts shared by every other Recon crate.
//!
//! # Key Types
//!
//! - [`Order`], [`Delivery`], [`Avoir`], [`Supplier`] — entities the core reads and writes
//! - [`StoreLedgerConfig`] / [`ColumnMap`] — validated per-store ledger mapping
//! - [`VerificationResult`] — verdict of a ledger lookup (confirmed, absent, indeterminate)
//! - [`VerificationRecord`] — durable, append-only trace of a confirmed verdict

pub mod entity;
pub mod error;
pub mod ids;
pub mod ledger_config;
pub mod verification;

pub use entity::{Avoir, AvoirStatus, Delivery, DeliveryStatus, Order, OrderStatus, Supplier};
pub use error::{ConfigError, TypeError};
pub use ids::{AvoirId, DeliveryId, OrderId, OwnerId, RecordId, StoreId, SupplierId};
pub use ledger_config::{ColumnMap, LookupColumn, StoreLedgerConfig, MAX_IDENTIFIER_LEN};
pub use verification::{
    MatchType, VerificationMode, VerificationRecord, VerificationResult,
    BL_COLUMN_NOT_CONFIGURED, INVALID_REFERENCE, LEDGER_NOT_CONFIGURED,
};

//! Repository boundary for Recon.
//!
//! The reconciliation core never owns storage. It reads and writes entities
//! through the traits in this crate, and the application plugs in whatever
//! backend it runs on.
//!
//! # Traits
//!
//! - [`OrderRepository`], [`DeliveryRepository`], [`AvoirRepository`],
//!   [`SupplierRepository`] — entity storage
//! - [`LedgerConfigRepository`] — per-store ledger mappings
//! - [`VerificationRecordRepository`] — append-only verification history
//! - [`Repository`] — all of the above, blanket-implemented
//!
//! # Backends
//!
//! - [`InMemoryRepository`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Application code writes deliveries only through [`DeliveryWriter`].
//! 2. The writer commits first, then runs [`DeliveryHook`]s.
//! 3. A confirmed verification record is inserted at most once per owner.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod hooks;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use hooks::{DeliveryHook, DeliveryWriter};
pub use memory::{InMemoryRepository, Table};
pub use traits::{
    AvoirRepository, DeliveryRepository, LedgerConfigRepository, OrderRepository, OwnerEntity,
    Repository, SupplierRepository, VerificationRecordRepository,
};

//! Reference verification for Recon.
//!
//! Answers "does this reference exist in the store's ledger?" for invoice
//! references and delivery-slip (BL) numbers.
//!
//! # Pipeline
//!
//! 1. Validate the reference locally: blank, oversized and filter-syntax
//!    references never reach the ledger.
//! 2. Return a live cached verdict unless a refresh is forced.
//! 3. Resolve the store's ledger mapping.
//! 4. Search the invoice column, then the BL column when configured.
//! 5. Cache the errorless verdict, positive or negative.
//! 6. On a confirmed match with an owner, persist one verification record.
//!
//! Failures never surface as errors: a [`VerificationResult`] with an error
//! message is indeterminate and is never cached.
//!
//! [`VerificationResult`]: recon_types::VerificationResult

pub mod cache;
pub mod config;
pub mod error;
pub mod service;

pub use cache::{normalize, CacheEntry, CacheKey, VerificationCache, ANY_SUPPLIER};
pub use config::{
    VerificationServiceConfig, DEFAULT_BATCH_DELAY, DEFAULT_CACHE_TTL, DEFAULT_MAX_REFERENCE_LEN,
};
pub use error::VerifyError;
pub use service::{VerificationRequest, VerificationService, Verdict};

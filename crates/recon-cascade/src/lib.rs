//! Status cascade for Recon.
//!
//! Keeps orders, deliveries and credit notes consistent:
//!
//! - [`StatusCascadeEngine`] is the post-commit [`DeliveryHook`] that
//!   propagates delivery state into the linked order and runs supplier-driven
//!   auto-reconciliation. It also owns the order repair sweep.
//! - [`DeliveryWorkflow`] is the application-facing delivery API; every
//!   write goes through a [`DeliveryWriter`] carrying the engine.
//! - [`AvoirWorkflow`] confirms credit notes against the ledger and manages
//!   their verified flag and status.
//!
//! [`DeliveryHook`]: recon_store::DeliveryHook
//! [`DeliveryWriter`]: recon_store::DeliveryWriter

pub mod avoir;
pub mod delivery;
pub mod engine;
pub mod error;

pub use avoir::{AvoirConfirmation, AvoirWorkflow};
pub use delivery::{BlData, DeliveryWorkflow};
pub use engine::{RepairReport, StatusCascadeEngine};
pub use error::{CascadeError, CascadeResult};

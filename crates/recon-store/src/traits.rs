use recon_types::{
    Avoir, AvoirId, Delivery, DeliveryId, Order, OrderId, OwnerId, StoreId, StoreLedgerConfig,
    Supplier, SupplierId, VerificationRecord,
};

use crate::error::StoreResult;

/// Orders as seen by the core.
pub trait OrderRepository: Send + Sync {
    /// Returns `Ok(None)` if the order does not exist.
    fn get_order(&self, id: &OrderId) -> StoreResult<Option<Order>>;

    /// Insert or replace an order.
    fn save_order(&self, order: &Order) -> StoreResult<()>;
}

/// Raw delivery storage.
///
/// Writes through this trait do NOT run delivery hooks. Application code
/// writes deliveries through [`crate::DeliveryWriter`]; only hooks themselves
/// write here directly.
pub trait DeliveryRepository: Send + Sync {
    fn get_delivery(&self, id: &DeliveryId) -> StoreResult<Option<Delivery>>;

    /// Insert or replace a delivery.
    fn save_delivery(&self, delivery: &Delivery) -> StoreResult<()>;

    /// Delete a delivery, returning it if it existed.
    fn delete_delivery(&self, id: &DeliveryId) -> StoreResult<Option<Delivery>>;

    /// All deliveries linked to an order.
    fn deliveries_for_order(&self, order: &OrderId) -> StoreResult<Vec<Delivery>>;

    /// All deliveries currently in the `delivered` state.
    fn delivered_deliveries(&self) -> StoreResult<Vec<Delivery>>;
}

pub trait AvoirRepository: Send + Sync {
    fn get_avoir(&self, id: &AvoirId) -> StoreResult<Option<Avoir>>;

    fn save_avoir(&self, avoir: &Avoir) -> StoreResult<()>;

    fn list_avoirs(&self) -> StoreResult<Vec<Avoir>>;
}

pub trait SupplierRepository: Send + Sync {
    fn get_supplier(&self, id: &SupplierId) -> StoreResult<Option<Supplier>>;

    fn save_supplier(&self, supplier: &Supplier) -> StoreResult<()>;
}

/// Source of per-store ledger mappings.
pub trait LedgerConfigRepository: Send + Sync {
    /// Returns `Ok(None)` when no ledger is configured for the store.
    fn store_ledger_config(&self, store: &StoreId) -> StoreResult<Option<StoreLedgerConfig>>;

    fn save_store_ledger_config(&self, config: &StoreLedgerConfig) -> StoreResult<()>;
}

/// An entity that can own verification records.
#[derive(Clone, Debug, PartialEq)]
pub enum OwnerEntity {
    Avoir(Avoir),
    Delivery(Delivery),
}

/// Append-only verification history.
pub trait VerificationRecordRepository: Send + Sync {
    /// Resolve an owner id to the entity it names.
    fn get_owner_entity(&self, owner: &OwnerId) -> StoreResult<Option<OwnerEntity>>;

    /// The confirmed (`exists = true`) record for an owner, if any.
    fn confirmed_record_for(&self, owner: &OwnerId) -> StoreResult<Option<VerificationRecord>>;

    /// Persist a confirmed record unless the owner already has one.
    ///
    /// Returns `true` if the record was inserted, `false` if a confirmed
    /// record already existed for the owner. The check and the insert are a
    /// single atomic step.
    fn persist_verification_record(&self, record: &VerificationRecord) -> StoreResult<bool>;

    /// Every record stored for an owner, oldest first.
    fn records_for_owner(&self, owner: &OwnerId) -> StoreResult<Vec<VerificationRecord>>;
}

/// The full repository the core runs against.
pub trait Repository:
    OrderRepository
    + DeliveryRepository
    + AvoirRepository
    + SupplierRepository
    + LedgerConfigRepository
    + VerificationRecordRepository
{
}

impl<T> Repository for T where
    T: OrderRepository
        + DeliveryRepository
        + AvoirRepository
        + SupplierRepository
        + LedgerConfigRepository
        + VerificationRecordRepository
{
}

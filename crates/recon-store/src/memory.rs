use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use recon_types::{
    Avoir, AvoirId, Delivery, DeliveryId, Order, OrderId, OwnerId, StoreId, StoreLedgerConfig,
    Supplier, SupplierId, VerificationRecord,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    AvoirRepository, DeliveryRepository, LedgerConfigRepository, OrderRepository, OwnerEntity,
    SupplierRepository, VerificationRecordRepository,
};

/// A table of the in-memory backend, used to simulate outages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Orders,
    Deliveries,
    Avoirs,
    Suppliers,
    LedgerConfigs,
    VerificationRecords,
}

#[derive(Default)]
struct RepoState {
    orders: HashMap<OrderId, Order>,
    deliveries: HashMap<DeliveryId, Delivery>,
    avoirs: HashMap<AvoirId, Avoir>,
    suppliers: HashMap<SupplierId, Supplier>,
    ledger_configs: HashMap<StoreId, StoreLedgerConfig>,
    records: Vec<VerificationRecord>,
}

/// In-memory, HashMap-based repository.
///
/// Intended for tests and embedding. All tables live behind one `RwLock`;
/// entities are cloned on read and write. Individual tables can be marked
/// unavailable to exercise failure paths.
pub struct InMemoryRepository {
    state: RwLock<RepoState>,
    unavailable: RwLock<HashSet<Table>>,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RepoState::default()),
            unavailable: RwLock::new(HashSet::new()),
        }
    }

    /// Make every operation on `table` fail with [`StoreError::Unavailable`]
    /// (or succeed again when `unavailable` is `false`).
    pub fn set_unavailable(&self, table: Table, unavailable: bool) {
        let mut tables = match self.unavailable.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if unavailable {
            tables.insert(table);
        } else {
            tables.remove(&table);
        }
    }

    /// Number of verification records across all owners.
    pub fn record_count(&self) -> usize {
        self.read(Table::VerificationRecords)
            .map(|state| state.records.len())
            .unwrap_or(0)
    }

    fn check(&self, table: Table) -> StoreResult<()> {
        let tables = self
            .unavailable
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if tables.contains(&table) {
            return Err(StoreError::Unavailable(format!("{table:?} table is offline")));
        }
        Ok(())
    }

    fn read(&self, table: Table) -> StoreResult<RwLockReadGuard<'_, RepoState>> {
        self.check(table)?;
        self.state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self, table: Table) -> StoreResult<RwLockWriteGuard<'_, RepoState>> {
        self.check(table)?;
        self.state
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("InMemoryRepository");
        if let Ok(state) = self.state.read() {
            s.field("orders", &state.orders.len())
                .field("deliveries", &state.deliveries.len())
                .field("avoirs", &state.avoirs.len())
                .field("records", &state.records.len());
        }
        s.finish()
    }
}

impl OrderRepository for InMemoryRepository {
    fn get_order(&self, id: &OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read(Table::Orders)?.orders.get(id).cloned())
    }

    fn save_order(&self, order: &Order) -> StoreResult<()> {
        self.write(Table::Orders)?
            .orders
            .insert(order.id, order.clone());
        Ok(())
    }
}

impl DeliveryRepository for InMemoryRepository {
    fn get_delivery(&self, id: &DeliveryId) -> StoreResult<Option<Delivery>> {
        Ok(self.read(Table::Deliveries)?.deliveries.get(id).cloned())
    }

    fn save_delivery(&self, delivery: &Delivery) -> StoreResult<()> {
        self.write(Table::Deliveries)?
            .deliveries
            .insert(delivery.id, delivery.clone());
        Ok(())
    }

    fn delete_delivery(&self, id: &DeliveryId) -> StoreResult<Option<Delivery>> {
        Ok(self.write(Table::Deliveries)?.deliveries.remove(id))
    }

    fn deliveries_for_order(&self, order: &OrderId) -> StoreResult<Vec<Delivery>> {
        let state = self.read(Table::Deliveries)?;
        let mut found: Vec<Delivery> = state
            .deliveries
            .values()
            .filter(|d| d.order_id.as_ref() == Some(order))
            .cloned()
            .collect();
        found.sort_by_key(|d| d.id);
        Ok(found)
    }

    fn delivered_deliveries(&self) -> StoreResult<Vec<Delivery>> {
        let state = self.read(Table::Deliveries)?;
        let mut found: Vec<Delivery> = state
            .deliveries
            .values()
            .filter(|d| d.is_delivered())
            .cloned()
            .collect();
        found.sort_by_key(|d| d.id);
        Ok(found)
    }
}

impl AvoirRepository for InMemoryRepository {
    fn get_avoir(&self, id: &AvoirId) -> StoreResult<Option<Avoir>> {
        Ok(self.read(Table::Avoirs)?.avoirs.get(id).cloned())
    }

    fn save_avoir(&self, avoir: &Avoir) -> StoreResult<()> {
        self.write(Table::Avoirs)?
            .avoirs
            .insert(avoir.id, avoir.clone());
        Ok(())
    }

    fn list_avoirs(&self) -> StoreResult<Vec<Avoir>> {
        let state = self.read(Table::Avoirs)?;
        let mut all: Vec<Avoir> = state.avoirs.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }
}

impl SupplierRepository for InMemoryRepository {
    fn get_supplier(&self, id: &SupplierId) -> StoreResult<Option<Supplier>> {
        Ok(self.read(Table::Suppliers)?.suppliers.get(id).cloned())
    }

    fn save_supplier(&self, supplier: &Supplier) -> StoreResult<()> {
        self.write(Table::Suppliers)?
            .suppliers
            .insert(supplier.id, supplier.clone());
        Ok(())
    }
}

impl LedgerConfigRepository for InMemoryRepository {
    fn store_ledger_config(&self, store: &StoreId) -> StoreResult<Option<StoreLedgerConfig>> {
        Ok(self.read(Table::LedgerConfigs)?.ledger_configs.get(store).cloned())
    }

    fn save_store_ledger_config(&self, config: &StoreLedgerConfig) -> StoreResult<()> {
        self.write(Table::LedgerConfigs)?
            .ledger_configs
            .insert(config.store_id, config.clone());
        Ok(())
    }
}

impl VerificationRecordRepository for InMemoryRepository {
    fn get_owner_entity(&self, owner: &OwnerId) -> StoreResult<Option<OwnerEntity>> {
        // Owners live in two tables; both must be reachable.
        self.check(Table::Avoirs)?;
        self.check(Table::Deliveries)?;
        let state = self
            .state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let avoir_id = AvoirId::from_uuid(*owner.as_uuid());
        if let Some(avoir) = state.avoirs.get(&avoir_id) {
            return Ok(Some(OwnerEntity::Avoir(avoir.clone())));
        }
        let delivery_id = DeliveryId::from_uuid(*owner.as_uuid());
        Ok(state
            .deliveries
            .get(&delivery_id)
            .cloned()
            .map(OwnerEntity::Delivery))
    }

    fn confirmed_record_for(&self, owner: &OwnerId) -> StoreResult<Option<VerificationRecord>> {
        let state = self.read(Table::VerificationRecords)?;
        Ok(state
            .records
            .iter()
            .find(|r| r.owner_entity_id == *owner && r.exists)
            .cloned())
    }

    fn persist_verification_record(&self, record: &VerificationRecord) -> StoreResult<bool> {
        let mut state = self.write(Table::VerificationRecords)?;
        // Check and insert under the same write guard.
        let already = state
            .records
            .iter()
            .any(|r| r.owner_entity_id == record.owner_entity_id && r.exists);
        if already && record.exists {
            return Ok(false);
        }
        state.records.push(record.clone());
        Ok(true)
    }

    fn records_for_owner(&self, owner: &OwnerId) -> StoreResult<Vec<VerificationRecord>> {
        let state = self.read(Table::VerificationRecords)?;
        Ok(state
            .records
            .iter()
            .filter(|r| r.owner_entity_id == *owner)
            .cloned()
            .collect())
    }
}

//! Delivery → order status propagation.
//!
//! [`StatusCascadeEngine`] is registered as a [`DeliveryHook`] on the
//! application's [`DeliveryWriter`](recon_store::DeliveryWriter), so every
//! committed delivery write passes through it regardless of which code path
//! made the write. The engine's own writes go to the raw repository and do
//! not re-enter the hook.
//!
//! Effects of a committed write:
//!
//! | write                                   | effect                                   |
//! |-----------------------------------------|------------------------------------------|
//! | planned delivery created on pending order | order → `planned`                      |
//! | delivery is `delivered`                 | order forced to `delivered`              |
//! | delivery became `delivered` with a BL   | auto-reconcile if the supplier allows it |
//! | last linked delivery deleted            | order → `pending`                        |
//!
//! Order propagation is the primary step and its failures are returned.
//! Auto-reconciliation is secondary: its failures are logged and swallowed.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use recon_store::{
    DeliveryHook, DeliveryRepository, OrderRepository, Repository, StoreResult,
    SupplierRepository,
};
use recon_types::{Delivery, DeliveryStatus, OrderId, OrderStatus};

/// Outcome of a repair sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Delivered deliveries linked to an order.
    pub scanned: usize,
    /// Orders moved to `delivered`.
    pub repaired: usize,
    /// Orders that could not be read or written.
    pub failed: usize,
}

pub struct StatusCascadeEngine {
    repo: Arc<dyn Repository>,
}

impl StatusCascadeEngine {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// React to a committed delivery write. `previous` is `None` on creation.
    #[instrument(skip_all, fields(delivery = %delivery.id, status = %delivery.status))]
    pub fn on_delivery_status_changed(
        &self,
        previous: Option<&Delivery>,
        delivery: &Delivery,
    ) -> StoreResult<()> {
        let Some(order_id) = delivery.order_id else {
            return Ok(());
        };

        if previous.is_none() && delivery.status == DeliveryStatus::Planned {
            self.plan_order(&order_id)?;
        }

        if !delivery.is_delivered() {
            return Ok(());
        }

        self.force_order_delivered(&order_id)?;

        let transitioned = previous.map_or(true, |p| !p.is_delivered());
        if transitioned {
            if let Err(e) = self.auto_reconcile(delivery) {
                warn!(error = %e, "auto-reconciliation failed, delivery left unreconciled");
            }
        }
        Ok(())
    }

    /// React to a committed delivery deletion.
    #[instrument(skip_all, fields(delivery = %deleted.id))]
    pub fn on_delivery_removed(&self, deleted: &Delivery) -> StoreResult<()> {
        let Some(order_id) = deleted.order_id else {
            return Ok(());
        };
        if !self.repo.deliveries_for_order(&order_id)?.is_empty() {
            debug!(order = %order_id, "order still has deliveries, status kept");
            return Ok(());
        }

        let Some(mut order) = self.repo.get_order(&order_id)? else {
            debug!(order = %order_id, "linked order does not exist");
            return Ok(());
        };
        if matches!(order.status, OrderStatus::Pending | OrderStatus::Cancelled) {
            return Ok(());
        }
        let from = order.status;
        order.status = OrderStatus::Pending;
        order.updated_at = Utc::now();
        self.repo.save_order(&order)?;
        info!(order = %order_id, %from, "last delivery removed, order back to pending");
        Ok(())
    }

    /// Force-sync the order of every delivered delivery. Safe to run any
    /// number of times.
    #[instrument(skip(self))]
    pub fn repair_orders(&self) -> StoreResult<RepairReport> {
        let mut report = RepairReport::default();
        for delivery in self.repo.delivered_deliveries()? {
            let Some(order_id) = delivery.order_id else {
                continue;
            };
            report.scanned += 1;
            match self.force_order_delivered(&order_id) {
                Ok(true) => report.repaired += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(order = %order_id, delivery = %delivery.id, error = %e, "repair failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            scanned = report.scanned,
            repaired = report.repaired,
            failed = report.failed,
            "order repair sweep finished"
        );
        Ok(report)
    }

    fn plan_order(&self, order_id: &OrderId) -> StoreResult<()> {
        let Some(mut order) = self.repo.get_order(order_id)? else {
            return Ok(());
        };
        if order.status != OrderStatus::Pending {
            return Ok(());
        }
        order.status = OrderStatus::Planned;
        order.updated_at = Utc::now();
        self.repo.save_order(&order)?;
        info!(order = %order_id, "order planned");
        Ok(())
    }

    /// Returns `true` if the order was changed.
    fn force_order_delivered(&self, order_id: &OrderId) -> StoreResult<bool> {
        let Some(mut order) = self.repo.get_order(order_id)? else {
            debug!(order = %order_id, "linked order does not exist");
            return Ok(false);
        };
        if order.status == OrderStatus::Delivered {
            return Ok(false);
        }
        let from = order.status;
        order.status = OrderStatus::Delivered;
        order.updated_at = Utc::now();
        self.repo.save_order(&order)?;
        info!(order = %order_id, %from, "order delivered");
        Ok(true)
    }

    /// Returns `true` if the delivery was reconciled.
    fn auto_reconcile(&self, delivery: &Delivery) -> StoreResult<bool> {
        if delivery.reconciled || delivery.bl_reference().is_none() {
            return Ok(false);
        }
        let Some(supplier_id) = delivery.supplier_id else {
            return Ok(false);
        };
        let Some(supplier) = self.repo.get_supplier(&supplier_id)? else {
            return Ok(false);
        };
        if !supplier.automatic_reconciliation {
            return Ok(false);
        }

        // Re-read so a concurrent write is not clobbered by the hook's copy.
        let Some(mut current) = self.repo.get_delivery(&delivery.id)? else {
            return Ok(false);
        };
        if current.reconciled {
            return Ok(false);
        }
        current.reconciled = true;
        current.validated_at = Some(Utc::now());
        self.repo.save_delivery(&current)?;
        info!(delivery = %delivery.id, supplier = %supplier.name, "delivery auto-reconciled");
        Ok(true)
    }
}

impl DeliveryHook for StatusCascadeEngine {
    fn name(&self) -> &str {
        "status-cascade"
    }

    fn on_delivery_written(&self, previous: Option<&Delivery>, current: &Delivery) -> StoreResult<()> {
        self.on_delivery_status_changed(previous, current)
    }

    fn on_delivery_deleted(&self, deleted: &Delivery) -> StoreResult<()> {
        self.on_delivery_removed(deleted)
    }
}

impl std::fmt::Debug for StatusCascadeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCascadeEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use recon_store::{InMemoryRepository, Table};
    use recon_types::{Order, Supplier};

    use super::*;

    fn setup() -> (Arc<InMemoryRepository>, StatusCascadeEngine) {
        let repo = Arc::new(InMemoryRepository::new());
        let engine = StatusCascadeEngine::new(repo.clone());
        (repo, engine)
    }

    fn delivered(mut d: Delivery) -> Delivery {
        d.status = DeliveryStatus::Delivered;
        d
    }

    #[test]
    fn creation_plans_pending_order() {
        let (repo, engine) = setup();
        let order = Order::new(None, None);
        repo.save_order(&order).unwrap();
        let delivery = Delivery::planned(Some(order.id), None);
        repo.save_delivery(&delivery).unwrap();

        engine.on_delivery_status_changed(None, &delivery).unwrap();
        assert_eq!(repo.get_order(&order.id).unwrap().unwrap().status, OrderStatus::Planned);
    }

    #[test]
    fn delivered_delivery_forces_order() {
        let (repo, engine) = setup();
        let order = Order::new(None, None).with_status(OrderStatus::Planned);
        repo.save_order(&order).unwrap();
        let before = Delivery::planned(Some(order.id), None);
        let after = delivered(before.clone());
        repo.save_delivery(&after).unwrap();

        engine.on_delivery_status_changed(Some(&before), &after).unwrap();
        assert_eq!(repo.get_order(&order.id).unwrap().unwrap().status, OrderStatus::Delivered);
    }

    #[test]
    fn unlinked_delivery_is_ignored() {
        let (repo, engine) = setup();
        let d = delivered(Delivery::planned(None, None));
        repo.save_delivery(&d).unwrap();
        engine.on_delivery_status_changed(None, &d).unwrap();
    }

    #[test]
    fn auto_reconcile_only_on_transition() {
        let (repo, engine) = setup();
        let supplier = Supplier::new("ACME", true);
        repo.save_supplier(&supplier).unwrap();
        let mut d = delivered(Delivery::planned(None, Some(supplier.id)).with_bl("BL123", None));
        d.order_id = Some(OrderId::new());
        repo.save_delivery(&d).unwrap();

        // Already delivered before: not a transition.
        engine.on_delivery_status_changed(Some(&d), &d).unwrap();
        assert!(!repo.get_delivery(&d.id).unwrap().unwrap().reconciled);

        let before = Delivery { status: DeliveryStatus::Planned, ..d.clone() };
        engine.on_delivery_status_changed(Some(&before), &d).unwrap();
        let stored = repo.get_delivery(&d.id).unwrap().unwrap();
        assert!(stored.reconciled);
        assert!(stored.validated_at.is_some());
    }

    #[test]
    fn blank_bl_is_not_reconciled() {
        let (repo, engine) = setup();
        let supplier = Supplier::new("ACME", true);
        repo.save_supplier(&supplier).unwrap();
        let mut d = delivered(Delivery::planned(None, Some(supplier.id)).with_bl("  ", None));
        d.order_id = Some(OrderId::new());
        repo.save_delivery(&d).unwrap();

        engine.on_delivery_status_changed(None, &d).unwrap();
        assert!(!repo.get_delivery(&d.id).unwrap().unwrap().reconciled);
    }

    #[test]
    fn order_failure_is_returned() {
        let (repo, engine) = setup();
        let order = Order::new(None, None);
        repo.save_order(&order).unwrap();
        let d = delivered(Delivery::planned(Some(order.id), None));
        repo.set_unavailable(Table::Orders, true);
        assert!(engine.on_delivery_status_changed(None, &d).is_err());
    }

    #[test]
    fn removal_of_last_delivery_resets_order() {
        let (repo, engine) = setup();
        let order = Order::new(None, None).with_status(OrderStatus::Delivered);
        repo.save_order(&order).unwrap();
        let d = delivered(Delivery::planned(Some(order.id), None));

        engine.on_delivery_removed(&d).unwrap();
        assert_eq!(repo.get_order(&order.id).unwrap().unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn removal_keeps_order_with_remaining_deliveries() {
        let (repo, engine) = setup();
        let order = Order::new(None, None).with_status(OrderStatus::Delivered);
        repo.save_order(&order).unwrap();
        let remaining = delivered(Delivery::planned(Some(order.id), None));
        repo.save_delivery(&remaining).unwrap();
        let removed = Delivery::planned(Some(order.id), None);

        engine.on_delivery_removed(&removed).unwrap();
        assert_eq!(repo.get_order(&order.id).unwrap().unwrap().status, OrderStatus::Delivered);
    }

    #[test]
    fn cancelled_order_is_not_reset() {
        let (repo, engine) = setup();
        let order = Order::new(None, None).with_status(OrderStatus::Cancelled);
        repo.save_order(&order).unwrap();
        engine
            .on_delivery_removed(&Delivery::planned(Some(order.id), None))
            .unwrap();
        assert_eq!(repo.get_order(&order.id).unwrap().unwrap().status, OrderStatus::Cancelled);
    }

    #[test]
    fn repair_counts() {
        let (repo, engine) = setup();
        let stale = Order::new(None, None).with_status(OrderStatus::Planned);
        let fine = Order::new(None, None).with_status(OrderStatus::Delivered);
        repo.save_order(&stale).unwrap();
        repo.save_order(&fine).unwrap();
        repo.save_delivery(&delivered(Delivery::planned(Some(stale.id), None))).unwrap();
        repo.save_delivery(&delivered(Delivery::planned(Some(fine.id), None))).unwrap();
        repo.save_delivery(&delivered(Delivery::planned(None, None))).unwrap();
        repo.save_delivery(&Delivery::planned(Some(stale.id), None)).unwrap();

        let report = engine.repair_orders().unwrap();
        assert_eq!(report, RepairReport { scanned: 2, repaired: 1, failed: 0 });
        assert_eq!(repo.get_order(&stale.id).unwrap().unwrap().status, OrderStatus::Delivered);
    }
}

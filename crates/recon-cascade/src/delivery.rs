use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use recon_store::{DeliveryWriter, Repository, StoreError};
use recon_types::{Delivery, DeliveryId, DeliveryStatus};

use crate::engine::{RepairReport, StatusCascadeEngine};
use crate::error::{CascadeError, CascadeResult};

/// Delivery-slip data captured at validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlData {
    #[serde(default)]
    pub bl_number: Option<String>,
    #[serde(default)]
    pub bl_amount: Option<f64>,
}

impl BlData {
    pub fn new(bl_number: impl Into<String>, bl_amount: Option<f64>) -> Self {
        Self {
            bl_number: Some(bl_number.into()),
            bl_amount,
        }
    }

    fn apply(self, delivery: &mut Delivery) {
        if let Some(number) = self.bl_number {
            delivery.bl_number = Some(number);
        }
        if let Some(amount) = self.bl_amount {
            delivery.bl_amount = Some(amount);
        }
    }
}

/// Delivery operations exposed to the application.
///
/// Every write goes through the [`DeliveryWriter`], so the cascade runs
/// after each committed change.
pub struct DeliveryWorkflow {
    writer: DeliveryWriter,
    engine: Arc<StatusCascadeEngine>,
}

impl DeliveryWorkflow {
    /// Build a writer over `repo` with the cascade engine registered.
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        let engine = Arc::new(StatusCascadeEngine::new(repo.clone()));
        let writer = DeliveryWriter::new(repo).with_hook(engine.clone());
        Self { writer, engine }
    }

    pub fn writer(&self) -> &DeliveryWriter {
        &self.writer
    }

    pub fn engine(&self) -> &StatusCascadeEngine {
        &self.engine
    }

    pub fn get(&self, id: &DeliveryId) -> CascadeResult<Delivery> {
        self.writer
            .get(id)?
            .ok_or(CascadeError::DeliveryNotFound(*id))
    }

    pub fn create_delivery(&self, delivery: Delivery) -> CascadeResult<Delivery> {
        self.writer.save(&delivery)?;
        info!(delivery = %delivery.id, order = ?delivery.order_id, "delivery created");
        Ok(delivery)
    }

    /// Mark a delivery delivered. Repeating the call is not an error: the
    /// first `delivered_date` and `validated_at` are kept, supplied BL data
    /// is applied, and the cascade runs again.
    #[instrument(skip(self, bl), fields(delivery = %id))]
    pub fn validate_delivery(&self, id: &DeliveryId, bl: Option<BlData>) -> CascadeResult<Delivery> {
        let now = Utc::now();
        let delivery = self
            .writer
            .update(id, |d| {
                d.status = DeliveryStatus::Delivered;
                d.delivered_date.get_or_insert(now);
                d.validated_at.get_or_insert(now);
                if let Some(bl) = bl {
                    bl.apply(d);
                }
            })
            .map_err(|e| not_found_as(e, id))?;
        info!("delivery validated");
        Ok(self.get(id).unwrap_or(delivery))
    }

    /// The generic status path. Moving a delivered delivery back to
    /// `planned` is rejected.
    #[instrument(skip(self), fields(delivery = %id))]
    pub fn update_delivery_status(
        &self,
        id: &DeliveryId,
        status: DeliveryStatus,
    ) -> CascadeResult<Delivery> {
        let current = self.get(id)?;
        if current.is_delivered() && status == DeliveryStatus::Planned {
            return Err(CascadeError::invalid_transition("delivery", current.status, status));
        }
        let now = Utc::now();
        let delivery = self
            .writer
            .update(id, |d| {
                d.status = status;
                if status == DeliveryStatus::Delivered {
                    d.delivered_date.get_or_insert(now);
                }
            })
            .map_err(|e| not_found_as(e, id))?;
        Ok(self.get(id).unwrap_or(delivery))
    }

    /// Replace the BL number and amount without touching the status.
    pub fn update_bl(
        &self,
        id: &DeliveryId,
        bl_number: Option<String>,
        bl_amount: Option<f64>,
    ) -> CascadeResult<Delivery> {
        self.writer
            .update(id, |d| {
                d.bl_number = bl_number;
                d.bl_amount = bl_amount;
            })
            .map_err(|e| not_found_as(e, id))
    }

    #[instrument(skip(self), fields(delivery = %id))]
    pub fn delete_delivery(&self, id: &DeliveryId) -> CascadeResult<Delivery> {
        let deleted = self
            .writer
            .delete(id)?
            .ok_or(CascadeError::DeliveryNotFound(*id))?;
        info!("delivery deleted");
        Ok(deleted)
    }

    pub fn repair_orders(&self) -> CascadeResult<RepairReport> {
        Ok(self.engine.repair_orders()?)
    }
}

impl std::fmt::Debug for DeliveryWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryWorkflow")
            .field("writer", &self.writer)
            .finish()
    }
}

fn not_found_as(err: StoreError, id: &DeliveryId) -> CascadeError {
    match err {
        StoreError::NotFound { .. } => CascadeError::DeliveryNotFound(*id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use recon_store::{InMemoryRepository, OrderRepository};
    use recon_types::{Order, OrderStatus};

    use super::*;

    fn setup() -> (Arc<InMemoryRepository>, DeliveryWorkflow) {
        let repo = Arc::new(InMemoryRepository::new());
        let workflow = DeliveryWorkflow::new(repo.clone());
        (repo, workflow)
    }

    #[test]
    fn validate_sets_dates_and_bl() {
        let (_, wf) = setup();
        let d = wf.create_delivery(Delivery::planned(None, None)).unwrap();

        let validated = wf
            .validate_delivery(&d.id, Some(BlData::new("BL-1", Some(10.0))))
            .unwrap();
        assert_eq!(validated.status, DeliveryStatus::Delivered);
        assert!(validated.delivered_date.is_some());
        assert!(validated.validated_at.is_some());
        assert_eq!(validated.bl_number.as_deref(), Some("BL-1"));
        assert_eq!(validated.bl_amount, Some(10.0));
    }

    #[test]
    fn repeat_validate_keeps_first_timestamps() {
        let (_, wf) = setup();
        let d = wf.create_delivery(Delivery::planned(None, None)).unwrap();
        let first = wf.validate_delivery(&d.id, None).unwrap();
        let second = wf
            .validate_delivery(&d.id, Some(BlData::new("BL-2", None)))
            .unwrap();
        assert_eq!(first.validated_at, second.validated_at);
        assert_eq!(first.delivered_date, second.delivered_date);
        assert_eq!(second.bl_number.as_deref(), Some("BL-2"));
    }

    #[test]
    fn missing_delivery_is_not_found() {
        let (_, wf) = setup();
        let id = DeliveryId::new();
        assert_eq!(wf.validate_delivery(&id, None), Err(CascadeError::DeliveryNotFound(id)));
        assert_eq!(wf.delete_delivery(&id), Err(CascadeError::DeliveryNotFound(id)));
        assert_eq!(wf.update_bl(&id, None, None), Err(CascadeError::DeliveryNotFound(id)));
    }

    #[test]
    fn status_cannot_go_back_to_planned() {
        let (_, wf) = setup();
        let d = wf.create_delivery(Delivery::planned(None, None)).unwrap();
        wf.validate_delivery(&d.id, None).unwrap();
        let err = wf
            .update_delivery_status(&d.id, DeliveryStatus::Planned)
            .unwrap_err();
        assert!(matches!(err, CascadeError::InvalidTransition { entity: "delivery", .. }));
    }

    #[test]
    fn generic_status_path_cascades() {
        let (repo, wf) = setup();
        let order = Order::new(None, None);
        repo.save_order(&order).unwrap();
        let d = wf.create_delivery(Delivery::planned(Some(order.id), None)).unwrap();
        assert_eq!(repo.get_order(&order.id).unwrap().unwrap().status, OrderStatus::Planned);

        let updated = wf
            .update_delivery_status(&d.id, DeliveryStatus::Delivered)
            .unwrap();
        assert!(updated.delivered_date.is_some());
        assert_eq!(repo.get_order(&order.id).unwrap().unwrap().status, OrderStatus::Delivered);
    }
}

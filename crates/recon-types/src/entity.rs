//! Back-office entities touched by the reconciliation core.
//!
//! These are the shapes the core reads and writes through the repository.
//! Everything else an entity may carry in the wider application (line items,
//! attachments, comments) is outside the core and not modelled here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{AvoirId, DeliveryId, OrderId, StoreId, SupplierId};

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Lifecycle of a supplier order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Planned,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Planned => "planned",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Lifecycle of a delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Planned,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Delivered => "delivered",
        }
    }
}

/// Lifecycle of a credit note request.
///
/// Variants are declared in lifecycle order; `Ord` follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvoirStatus {
    PendingRequest,
    Requested,
    Received,
}

impl AvoirStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingRequest => "pending_request",
            Self::Requested => "requested",
            Self::Received => "received",
        }
    }
}

macro_rules! status_text {
    ($ty:ident, $entity:literal, [$($variant:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == Self::$variant.as_str() {
                        return Ok(Self::$variant);
                    }
                )+
                Err(TypeError::UnknownStatus { entity: $entity, value: s.to_string() })
            }
        }
    };
}

status_text!(OrderStatus, "order", [Pending, Planned, Delivered, Cancelled]);
status_text!(DeliveryStatus, "delivery", [Planned, Delivered]);
status_text!(AvoirStatus, "avoir", [PendingRequest, Requested, Received]);

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A supplier order. Owns zero or more deliveries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub supplier_id: Option<SupplierId>,
    pub store_id: Option<StoreId>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A fresh `pending` order.
    pub fn new(supplier_id: Option<SupplierId>, store_id: Option<StoreId>) -> Self {
        Self {
            id: OrderId::new(),
            status: OrderStatus::Pending,
            supplier_id,
            store_id,
            updated_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }
}

/// A delivery, optionally attached to an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub order_id: Option<OrderId>,
    pub supplier_id: Option<SupplierId>,
    pub store_id: Option<StoreId>,
    pub status: DeliveryStatus,
    pub bl_number: Option<String>,
    pub bl_amount: Option<f64>,
    pub reconciled: bool,
    pub delivered_date: Option<DateTime<Utc>>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl Delivery {
    /// A fresh `planned` delivery.
    pub fn planned(order_id: Option<OrderId>, supplier_id: Option<SupplierId>) -> Self {
        Self {
            id: DeliveryId::new(),
            order_id,
            supplier_id,
            store_id: None,
            status: DeliveryStatus::Planned,
            bl_number: None,
            bl_amount: None,
            reconciled: false,
            delivered_date: None,
            validated_at: None,
        }
    }

    pub fn with_store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_bl(mut self, bl_number: impl Into<String>, bl_amount: Option<f64>) -> Self {
        self.bl_number = Some(bl_number.into());
        self.bl_amount = bl_amount;
        self
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }

    /// The BL number, if present and not blank.
    pub fn bl_reference(&self) -> Option<&str> {
        self.bl_number
            .as_deref()
            .map(str::trim)
            .filter(|bl| !bl.is_empty())
    }
}

/// A supplier credit note / refund request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Avoir {
    pub id: AvoirId,
    pub status: AvoirStatus,
    pub supplier_id: Option<SupplierId>,
    pub store_id: Option<StoreId>,
    /// Credit-note reference as written on the supplier document.
    pub reference: Option<String>,
    pub amount: Option<f64>,
    pub nocodb_verified: bool,
    pub nocodb_verified_at: Option<DateTime<Utc>>,
}

impl Avoir {
    /// A fresh credit note awaiting its request.
    pub fn new(store_id: Option<StoreId>, reference: Option<String>) -> Self {
        Self {
            id: AvoirId::new(),
            status: AvoirStatus::PendingRequest,
            supplier_id: None,
            store_id,
            reference,
            amount: None,
            nocodb_verified: false,
            nocodb_verified_at: None,
        }
    }

    pub fn with_supplier(mut self, supplier_id: SupplierId) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }
}

/// A supplier. Only the fields the core consumes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub automatic_reconciliation: bool,
}

impl Supplier {
    pub fn new(name: impl Into<String>, automatic_reconciliation: bool) -> Self {
        Self {
            id: SupplierId::new(),
            name: name.into(),
            automatic_reconciliation,
        }
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new time-ordered identifier (UUID v7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Create from an existing UUID.
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Short representation (first 8 characters of UUID).
            pub fn short_id(&self) -> String {
                self.0.to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypeError::InvalidId(format!("{s}: {e}")))
            }
        }
    };
}

entity_id!(
    /// Identifier of a supplier order.
    OrderId
);
entity_id!(
    /// Identifier of a delivery.
    DeliveryId
);
entity_id!(
    /// Identifier of a credit note (avoir).
    AvoirId
);
entity_id!(
    /// Identifier of a supplier.
    SupplierId
);
entity_id!(
    /// Identifier of a persisted verification record.
    RecordId
);
entity_id!(
    /// The entity a verification record belongs to.
    ///
    /// Owners are Avoirs or Deliveries; the id is the owner's own UUID so a
    /// record can be looked up from either side.
    OwnerId
);

impl From<AvoirId> for OwnerId {
    fn from(id: AvoirId) -> Self {
        Self(id.0)
    }
}

impl From<DeliveryId> for OwnerId {
    fn from(id: DeliveryId) -> Self {
        Self(id.0)
    }
}

/// Identifier of a retail store. Each store has its own ledger table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub u32);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StoreId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(OrderId::new(), OrderId::new());
        assert_ne!(DeliveryId::new(), DeliveryId::new());
    }

    #[test]
    fn ids_are_time_ordered() {
        let a = AvoirId::new();
        let b = AvoirId::new();
        assert!(a < b);
    }

    #[test]
    fn owner_id_keeps_entity_uuid() {
        let avoir = AvoirId::new();
        let owner = OwnerId::from(avoir);
        assert_eq!(owner.as_uuid(), avoir.as_uuid());

        let delivery = DeliveryId::new();
        assert_eq!(OwnerId::from(delivery).as_uuid(), delivery.as_uuid());
    }

    #[test]
    fn parse_round_trip() {
        let id = DeliveryId::new();
        let parsed: DeliveryId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<OrderId>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidId(_)));
    }

    #[test]
    fn debug_is_short() {
        let id = SupplierId::new();
        let dbg = format!("{id:?}");
        assert!(dbg.starts_with("SupplierId("));
        assert_eq!(dbg.len(), "SupplierId(".len() + 8 + 1);
    }

    #[test]
    fn store_id_serializes_as_number() {
        let json = serde_json::to_string(&StoreId(7)).unwrap();
        assert_eq!(json, "7");
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OwnerId, RecordId, StoreId};
use crate::ledger_config::LookupColumn;

/// Error message for a reference that fails local validation.
pub const INVALID_REFERENCE: &str = "invalid reference";
/// Error message for a store without a ledger mapping.
pub const LEDGER_NOT_CONFIGURED: &str = "ledger not configured";
/// Error message for a BL lookup on a store whose table has no BL column.
pub const BL_COLUMN_NOT_CONFIGURED: &str = "bl column not configured";

/// Which ledger column produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    InvoiceReference,
    BlNumber,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvoiceReference => "invoice_reference",
            Self::BlNumber => "bl_number",
            Self::None => "none",
        }
    }
}

impl From<LookupColumn> for MatchType {
    fn from(column: LookupColumn) -> Self {
        match column {
            LookupColumn::InvoiceReference => Self::InvoiceReference,
            LookupColumn::BlNumber => Self::BlNumber,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a verification looks up: an invoice reference (with BL fallback) or
/// a delivery-slip number only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    Invoice,
    Bl,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Bl => "bl",
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of a single verification.
///
/// Three shapes are possible:
/// - confirmed: `exists = true`, a concrete `match_type`;
/// - confirmed absent: `exists = false`, `match_type = None`, no error;
/// - indeterminate: `error_message` is set. Callers must never treat this as
///   a confirmed absence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub exists: bool,
    pub match_type: MatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_name_matched: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl VerificationResult {
    pub fn found(
        match_type: MatchType,
        invoice_amount: Option<f64>,
        supplier_name_matched: Option<String>,
    ) -> Self {
        Self {
            exists: true,
            match_type,
            invoice_amount,
            supplier_name_matched,
            error_message: None,
        }
    }

    pub fn absent() -> Self {
        Self {
            exists: false,
            match_type: MatchType::None,
            invoice_amount: None,
            supplier_name_matched: None,
            error_message: None,
        }
    }

    pub fn indeterminate(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::absent()
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.exists && self.error_message.is_none()
    }

    pub fn is_confirmed_absent(&self) -> bool {
        !self.exists && self.match_type == MatchType::None && self.error_message.is_none()
    }

    pub fn is_indeterminate(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Durable trace of a verification tied to an owner entity.
///
/// Append-only: a record is never rewritten once stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: RecordId,
    pub owner_entity_id: OwnerId,
    pub store_id: StoreId,
    pub reference: String,
    pub supplier_name: Option<String>,
    pub exists: bool,
    pub match_type: MatchType,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Build a record from a verdict.
    pub fn from_result(
        owner: OwnerId,
        store_id: StoreId,
        reference: impl Into<String>,
        supplier_name: Option<String>,
        result: &VerificationResult,
    ) -> Self {
        Self {
            id: RecordId::new(),
            owner_entity_id: owner,
            store_id,
            reference: reference.into(),
            supplier_name,
            exists: result.exists,
            match_type: result.match_type,
            is_valid: result.is_confirmed(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_shapes_are_distinguishable() {
        let found = VerificationResult::found(MatchType::InvoiceReference, Some(10.0), None);
        assert!(found.is_confirmed());
        assert!(!found.is_confirmed_absent());

        let absent = VerificationResult::absent();
        assert!(absent.is_confirmed_absent());
        assert!(!absent.is_indeterminate());

        let unknown = VerificationResult::indeterminate("network error: timed out");
        assert!(unknown.is_indeterminate());
        assert!(!unknown.is_confirmed_absent());
        assert!(!unknown.exists);
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = VerificationResult::found(MatchType::BlNumber, Some(156.78), Some("ACME".into()));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["exists"], true);
        assert_eq!(json["matchType"], "bl_number");
        assert_eq!(json["invoiceAmount"], 156.78);
        assert_eq!(json["supplierNameMatched"], "ACME");
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn record_validity_follows_verdict() {
        let owner = OwnerId::new();
        let result = VerificationResult::found(MatchType::InvoiceReference, None, None);
        let record = VerificationRecord::from_result(owner, StoreId(7), "FAC-1", None, &result);
        assert!(record.exists);
        assert!(record.is_valid);
        assert_eq!(record.owner_entity_id, owner);
    }

    #[test]
    fn lookup_column_maps_to_match_type() {
        assert_eq!(MatchType::from(LookupColumn::BlNumber), MatchType::BlNumber);
        assert_eq!(MatchType::from(LookupColumn::InvoiceReference).to_string(), "invoice_reference");
    }
}

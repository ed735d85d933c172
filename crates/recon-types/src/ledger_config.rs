//! Per-store mapping onto the external ledger.
//!
//! Every store keeps its invoices in its own ledger table, and each table
//! names its columns differently. A [`ColumnMap`] is validated once when it is
//! built; afterwards the core only ever asks it for a [`LookupColumn`] or one
//! of the named accessors, never for an arbitrary field name.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ids::StoreId;

/// Longest table or column name accepted in a mapping.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// The column a ledger search filters on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupColumn {
    InvoiceReference,
    BlNumber,
}

/// Validated column names of one store's ledger table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumnMap", into = "RawColumnMap")]
pub struct ColumnMap {
    invoice_column: String,
    bl_column: Option<String>,
    amount_column: String,
    supplier_column: String,
}

impl ColumnMap {
    pub fn new(
        invoice_column: impl Into<String>,
        bl_column: Option<String>,
        amount_column: impl Into<String>,
        supplier_column: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let invoice_column = validate_identifier("invoice_column", invoice_column.into())?;
        let bl_column = bl_column
            .map(|c| validate_identifier("bl_column", c))
            .transpose()?;
        let amount_column = validate_identifier("amount_column", amount_column.into())?;
        let supplier_column = validate_identifier("supplier_column", supplier_column.into())?;
        Ok(Self {
            invoice_column,
            bl_column,
            amount_column,
            supplier_column,
        })
    }

    pub fn invoice_column(&self) -> &str {
        &self.invoice_column
    }

    pub fn bl_column(&self) -> Option<&str> {
        self.bl_column.as_deref()
    }

    pub fn amount_column(&self) -> &str {
        &self.amount_column
    }

    pub fn supplier_column(&self) -> &str {
        &self.supplier_column
    }

    /// Resolve a lookup column to its name in this table.
    ///
    /// Returns `None` for [`LookupColumn::BlNumber`] when the table has no BL
    /// column.
    pub fn column_for(&self, lookup: LookupColumn) -> Option<&str> {
        match lookup {
            LookupColumn::InvoiceReference => Some(&self.invoice_column),
            LookupColumn::BlNumber => self.bl_column.as_deref(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawColumnMap {
    invoice_column: String,
    #[serde(default)]
    bl_column: Option<String>,
    amount_column: String,
    supplier_column: String,
}

impl TryFrom<RawColumnMap> for ColumnMap {
    type Error = ConfigError;

    fn try_from(raw: RawColumnMap) -> Result<Self, Self::Error> {
        Self::new(
            raw.invoice_column,
            raw.bl_column,
            raw.amount_column,
            raw.supplier_column,
        )
    }
}

impl From<ColumnMap> for RawColumnMap {
    fn from(map: ColumnMap) -> Self {
        Self {
            invoice_column: map.invoice_column,
            bl_column: map.bl_column,
            amount_column: map.amount_column,
            supplier_column: map.supplier_column,
        }
    }
}

/// Where one store's invoices live in the external ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLedgerConfig {
    pub store_id: StoreId,
    table_name: String,
    pub columns: ColumnMap,
}

impl StoreLedgerConfig {
    pub fn new(
        store_id: StoreId,
        table_name: impl Into<String>,
        columns: ColumnMap,
    ) -> Result<Self, ConfigError> {
        let table_name = validate_identifier("table_name", table_name.into())?;
        Ok(Self {
            store_id,
            table_name,
            columns,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

fn validate_identifier(field: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { field });
    }
    if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(ConfigError::TooLong {
            field,
            max: MAX_IDENTIFIER_LEN,
        });
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' ');
    if !trimmed.chars().all(allowed) {
        return Err(ConfigError::InvalidCharacter {
            field,
            value: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

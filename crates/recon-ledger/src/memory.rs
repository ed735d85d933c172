use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use recon_types::{LookupColumn, StoreLedgerConfig};

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{LedgerRecord, LedgerSource, SearchOutcome};

/// In-memory ledger for tests, local demos, and embedding.
///
/// Holds rows per table name, counts every search that reaches it, and can
/// be told to fail every search with a given error.
#[derive(Default)]
pub struct InMemoryLedgerSource {
    tables: RwLock<HashMap<String, Vec<LedgerRecord>>>,
    failure: RwLock<Option<LedgerError>>,
    calls: AtomicUsize,
}

impl InMemoryLedgerSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a table. Non-object values are ignored.
    pub fn insert_row(&self, table: &str, row: Value) {
        let Value::Object(fields) = row else {
            return;
        };
        let mut tables = match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables
            .entry(table.to_string())
            .or_default()
            .push(LedgerRecord::new(fields));
    }

    /// Fail every subsequent search with `error`, or stop failing with `None`.
    pub fn fail_with(&self, error: Option<LedgerError>) {
        let mut failure = match self.failure.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *failure = error;
    }

    /// Number of searches that reached the ledger, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryLedgerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerSource")
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl LedgerSource for InMemoryLedgerSource {
    async fn search(
        &self,
        config: &StoreLedgerConfig,
        column: LookupColumn,
        value: &str,
    ) -> LedgerResult<SearchOutcome> {
        let Some(column_name) = config.columns.column_for(column) else {
            return Ok(SearchOutcome::NotFound);
        };
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self
            .failure
            .read()
            .map_err(|e| LedgerError::Network(format!("lock poisoned: {e}")))?
            .clone()
        {
            return Err(err);
        }

        let tables = self
            .tables
            .read()
            .map_err(|e| LedgerError::Network(format!("lock poisoned: {e}")))?;
        let found = tables
            .get(config.table_name())
            .and_then(|rows| {
                rows.iter()
                    .find(|row| row.text(column_name).as_deref() == Some(value))
            })
            .cloned();

        Ok(match found {
            Some(record) => SearchOutcome::Found(record),
            None => SearchOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_types::{ColumnMap, StoreId};
    use serde_json::json;

    fn config(bl: bool) -> StoreLedgerConfig {
        let bl_column = bl.then(|| "NumBL".to_string());
        let columns = ColumnMap::new("NumFacture", bl_column, "Montant", "Fournisseur").unwrap();
        StoreLedgerConfig::new(StoreId(7), "Factures", columns).unwrap()
    }

    #[tokio::test]
    async fn finds_row_by_column() {
        let ledger = InMemoryLedgerSource::new();
        ledger.insert_row("Factures", json!({"NumFacture": "FAC-1", "Montant": 10.0}));
        ledger.insert_row("Factures", json!({"NumFacture": "FAC-2", "Montant": 20.0}));

        let outcome = ledger
            .search(&config(false), LookupColumn::InvoiceReference, "FAC-2")
            .await
            .unwrap();
        match outcome {
            SearchOutcome::Found(record) => assert_eq!(record.amount("Montant"), Some(20.0)),
            SearchOutcome::NotFound => panic!("expected a match"),
        }
        assert_eq!(ledger.call_count(), 1);
    }

    #[tokio::test]
    async fn other_tables_are_not_searched() {
        let ledger = InMemoryLedgerSource::new();
        ledger.insert_row("Autres", json!({"NumFacture": "FAC-1"}));
        let outcome = ledger
            .search(&config(false), LookupColumn::InvoiceReference, "FAC-1")
            .await
            .unwrap();
        assert_eq!(outcome, SearchOutcome::NotFound);
    }

    #[tokio::test]
    async fn unmapped_column_does_not_count_as_call() {
        let ledger = InMemoryLedgerSource::new();
        let outcome = ledger
            .search(&config(false), LookupColumn::BlNumber, "BL1")
            .await
            .unwrap();
        assert_eq!(outcome, SearchOutcome::NotFound);
        assert_eq!(ledger.call_count(), 0);
    }

    #[tokio::test]
    async fn injected_failure_is_returned_until_cleared() {
        let ledger = InMemoryLedgerSource::new();
        ledger.insert_row("Factures", json!({"NumFacture": "FAC-1"}));
        ledger.fail_with(Some(LedgerError::Network("connection refused".into())));

        let err = ledger
            .search(&config(true), LookupColumn::InvoiceReference, "FAC-1")
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::Network("connection refused".into()));

        ledger.fail_with(None);
        let outcome = ledger
            .search(&config(true), LookupColumn::InvoiceReference, "FAC-1")
            .await
            .unwrap();
        assert!(outcome.is_found());
        assert_eq!(ledger.call_count(), 2);
    }
}

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use recon_types::{LookupColumn, StoreLedgerConfig};

use crate::error::LedgerResult;

/// One row returned by the ledger.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerRecord {
    fields: Map<String, Value>,
}

impl LedgerRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Text value of a column. Numbers are rendered; blanks are `None`.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.fields.get(column)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric value of a column.
    ///
    /// Accepts JSON numbers and numeric strings using either `.` or `,` as
    /// the decimal separator (`"156,78"`). When both appear, the last one is
    /// the decimal separator and the other groups thousands (`"1.234,56"`,
    /// `"1,234.56"`). Spaces are ignored.
    pub fn amount(&self, column: &str) -> Option<f64> {
        match self.fields.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let parsed = parse_amount(s);
                if parsed.is_none() {
                    debug!(column, value = %s, "ledger amount is not numeric");
                }
                parsed
            }
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let decimal = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if comma > dot { ',' } else { '.' }),
        (None, Some(_)) => Some(','),
        (Some(_), None) => Some('.'),
        (None, None) => None,
    };
    let normalized: String = compact
        .chars()
        .filter_map(|c| match c {
            '.' | ',' if Some(c) == decimal => Some('.'),
            '.' | ',' => None,
            other => Some(other),
        })
        .collect();
    normalized.parse().ok()
}

/// Outcome of a single ledger search.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    Found(LedgerRecord),
    NotFound,
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Read access to the external ledger.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Look up the first row of the store's table whose `column` equals
    /// `value`.
    ///
    /// A lookup on a column the store does not map returns
    /// [`SearchOutcome::NotFound`] without contacting the ledger.
    async fn search(
        &self,
        config: &StoreLedgerConfig,
        column: LookupColumn,
        value: &str,
    ) -> LedgerResult<SearchOutcome>;
}

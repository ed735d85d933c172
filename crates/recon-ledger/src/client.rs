//! HTTP client for the ledger's REST query endpoint.
//!
//! Each search is one `GET` against
//! `{base_url}/api/v1/db/data/v1/{project_id}/{table}` with an equality
//! filter `where=({column},eq,{value})` and the deployment token in the
//! `xc-token` header. The response is `{ "list": [ ... ] }`; the first row
//! is authoritative.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use recon_types::{LookupColumn, StoreLedgerConfig};

use crate::error::{ClientConfigError, LedgerError, LedgerResult};
use crate::traits::{LedgerRecord, LedgerSource, SearchOutcome};

/// Header carrying the deployment token.
pub const TOKEN_HEADER: &str = "xc-token";

/// Characters with a meaning in the `where` filter grammar. A value holding
/// any of them cannot be expressed as a plain equality filter.
pub const FILTER_RESERVED: &[char] = &['(', ')', ',', '~'];

/// Whether `value` can be sent verbatim inside an equality filter.
pub fn is_filter_safe(value: &str) -> bool {
    !value.contains(FILTER_RESERVED)
}

/// Longest response-body excerpt kept in an HTTP error message.
const BODY_EXCERPT_LEN: usize = 200;

/// Connection settings for the ledger, one per deployment.
#[derive(Clone, Serialize, Deserialize)]
pub struct LedgerClientConfig {
    pub base_url: String,
    pub project_id: String,
    pub api_token: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    10
}

impl LedgerClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            project_id: project_id.into(),
            api_token: api_token.into(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }

    pub fn with_timeouts(mut self, connect_secs: u64, read_secs: u64) -> Self {
        self.connect_timeout_secs = connect_secs;
        self.read_timeout_secs = read_secs;
        self
    }

    pub fn validate(&self) -> Result<(), ClientConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.project_id.trim().is_empty() {
            return Err(ClientConfigError::Empty("project_id"));
        }
        if self.api_token.trim().is_empty() {
            return Err(ClientConfigError::Empty("api_token"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for LedgerClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClientConfig")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("api_token", &"[REDACTED]")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .finish()
    }
}

#[derive(Deserialize)]
struct LedgerPage {
    list: Vec<Value>,
}

/// Production [`LedgerSource`] backed by `reqwest`.
///
/// Built once at process start; the inner client pools connections.
#[derive(Debug)]
pub struct HttpLedgerClient {
    config: LedgerClientConfig,
    client: Client,
}

impl HttpLedgerClient {
    pub fn new(config: LedgerClientConfig) -> Result<Self, ClientConfigError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ClientConfigError::Build(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LedgerClientConfig {
        &self.config
    }

    /// Query endpoint for a table.
    pub fn endpoint(&self, table: &str) -> String {
        format!(
            "{}/api/v1/db/data/v1/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            table
        )
    }
}

#[async_trait]
impl LedgerSource for HttpLedgerClient {
    #[instrument(skip(self, config), fields(store_id = %config.store_id, table = config.table_name()))]
    async fn search(
        &self,
        config: &StoreLedgerConfig,
        column: LookupColumn,
        value: &str,
    ) -> LedgerResult<SearchOutcome> {
        let Some(column_name) = config.columns.column_for(column) else {
            debug!(?column, "column not mapped for store, skipping lookup");
            return Ok(SearchOutcome::NotFound);
        };

        if !is_filter_safe(value) {
            warn!(?column, "value contains filter syntax, no lookup sent");
            return Ok(SearchOutcome::NotFound);
        }

        let url = self.endpoint(config.table_name());
        let filter = format!("({column_name},eq,{value})");
        debug!(url = %url, filter = %filter, "querying ledger");

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.config.api_token)
            .query(&[("where", filter.as_str())])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            warn!(status = %status, "ledger returned an error status");
            return Err(LedgerError::Http {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }

        let page: LedgerPage = serde_json::from_str(&body)
            .map_err(|e| LedgerError::Parse(format!("unexpected ledger response: {e}")))?;

        match page.list.into_iter().next() {
            Some(Value::Object(fields)) => Ok(SearchOutcome::Found(LedgerRecord::new(fields))),
            Some(other) => Err(LedgerError::Parse(format!(
                "ledger row is not an object: {other}"
            ))),
            None => Ok(SearchOutcome::NotFound),
        }
    }
}

fn classify_transport(err: reqwest::Error) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Network(format!("ledger request timed out: {err}"))
    } else if err.is_connect() {
        LedgerError::Network(format!("cannot reach ledger: {err}"))
    } else {
        LedgerError::Network(err.to_string())
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty response body".into();
    }
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

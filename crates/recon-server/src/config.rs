use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use recon_ledger::LedgerClientConfig;
use recon_types::{ColumnMap, StoreId, StoreLedgerConfig};
use recon_verify::{VerificationServiceConfig, DEFAULT_MAX_REFERENCE_LEN};

use crate::error::{ServerError, ServerResult};

/// Environment variable that overrides `ledger.api_token`.
pub const TOKEN_ENV: &str = "RECON_LEDGER_TOKEN";

/// Process configuration, read from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    pub ledger: LedgerClientConfig,
    #[serde(default)]
    pub stores: Vec<StoreEntry>,
}

/// One `[[stores]]` table: where a store's invoices live in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub store_id: u32,
    pub table_name: String,
    pub invoice_column: String,
    #[serde(default)]
    pub bl_column: Option<String>,
    pub amount_column: String,
    pub supplier_column: String,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_batch_delay_ms() -> u64 {
    500
}

impl StoreEntry {
    pub fn to_ledger_config(&self) -> ServerResult<StoreLedgerConfig> {
        let store_id = StoreId(self.store_id);
        let columns = ColumnMap::new(
            self.invoice_column.clone(),
            self.bl_column.clone(),
            self.amount_column.clone(),
            self.supplier_column.clone(),
        )
        .map_err(|e| ServerError::Config(format!("store {store_id}: {e}")))?;
        StoreLedgerConfig::new(store_id, self.table_name.clone(), columns)
            .map_err(|e| ServerError::Config(format!("store {store_id}: {e}")))
    }
}

impl ReconConfig {
    /// Read, override and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&text)?;
        config.override_token(std::env::var(TOKEN_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Replace the ledger token when `token` is set and not blank.
    pub fn override_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.ledger.api_token = token;
        }
    }

    pub fn validate(&self) -> ServerResult<()> {
        self.ledger
            .validate()
            .map_err(|e| ServerError::Config(format!("ledger: {e}")))?;
        self.store_configs()?;
        self.verification_config()
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(())
    }

    /// Validated ledger mappings, one per store.
    pub fn store_configs(&self) -> ServerResult<Vec<StoreLedgerConfig>> {
        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(self.stores.len());
        for entry in &self.stores {
            if !seen.insert(entry.store_id) {
                return Err(ServerError::Config(format!(
                    "duplicate store id {}",
                    entry.store_id
                )));
            }
            configs.push(entry.to_ledger_config()?);
        }
        Ok(configs)
    }

    pub fn verification_config(&self) -> VerificationServiceConfig {
        VerificationServiceConfig {
            cache_ttl_secs: self.cache_ttl_secs,
            batch_delay_ms: self.batch_delay_ms,
            max_reference_len: DEFAULT_MAX_REFERENCE_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
bind_addr = "0.0.0.0:9000"
batch_delay_ms = 250

[ledger]
base_url = "https://ledger.example.com"
project_id = "p_abc"
api_token = "file-token"

[[stores]]
store_id = 7
table_name = "Factures"
invoice_column = "NumFacture"
bl_column = "NumBL"
amount_column = "MontantTTC"
supplier_column = "Fournisseur"

[[stores]]
store_id = 8
table_name = "Factures Est"
invoice_column = "NumFacture"
amount_column = "Montant"
supplier_column = "Fournisseur"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = ReconConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.batch_delay_ms, 250);
        assert_eq!(config.ledger.connect_timeout_secs, 5);
        assert_eq!(config.ledger.read_timeout_secs, 10);

        let stores = config.store_configs().unwrap();
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].columns.bl_column(), Some("NumBL"));
        assert_eq!(stores[1].columns.bl_column(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = ReconConfig::load(file.path()).unwrap();
        assert_eq!(config.stores.len(), 2);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReconConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn token_override() {
        let mut config = ReconConfig::from_toml_str(SAMPLE).unwrap();
        config.override_token(Some("  ".into()));
        assert_eq!(config.ledger.api_token, "file-token");
        config.override_token(Some("env-token".into()));
        assert_eq!(config.ledger.api_token, "env-token");
    }

    #[test]
    fn duplicate_store_is_rejected() {
        let mut config = ReconConfig::from_toml_str(SAMPLE).unwrap();
        config.stores[1].store_id = 7;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate store id 7"));
    }

    #[test]
    fn invalid_column_is_rejected() {
        let mut config = ReconConfig::from_toml_str(SAMPLE).unwrap();
        config.stores[0].amount_column = "Montant;DROP".into();
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn ledger_section_is_required() {
        assert!(ReconConfig::from_toml_str("bind_addr = \"127.0.0.1:1\"").is_err());
    }
}

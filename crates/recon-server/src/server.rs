use std::sync::Arc;

use tokio::net::TcpListener;

use recon_store::Repository;

use crate::config::ReconConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Recon HTTP server.
pub struct ReconServer {
    config: ReconConfig,
    state: AppState,
}

impl ReconServer {
    /// Validate the configuration and build every service.
    pub fn new(config: ReconConfig) -> ServerResult<Self> {
        config.validate()?;
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    /// Like [`Self::new`], over a caller-supplied repository.
    pub fn with_repository(config: ReconConfig, repo: Arc<dyn Repository>) -> ServerResult<Self> {
        config.validate()?;
        let state = AppState::with_repository(&config, repo)?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Recon server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReconConfig {
        ReconConfig::from_toml_str(
            r#"
[ledger]
base_url = "https://ledger.example.com"
project_id = "p_abc"
api_token = "secret"

[[stores]]
store_id = 7
table_name = "Factures"
invoice_column = "NumFacture"
amount_column = "MontantTTC"
supplier_column = "Fournisseur"
"#,
        )
        .unwrap()
    }

    #[test]
    fn server_construction() {
        let server = ReconServer::new(config()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(server.state().verifier.config().cache_ttl_secs, 3600);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.ledger.api_token = String::new();
        assert!(ReconServer::new(config).is_err());
    }

    #[test]
    fn supplied_repository_receives_store_mappings() {
        use recon_store::{InMemoryRepository, LedgerConfigRepository};
        use recon_types::StoreId;

        let repo = Arc::new(InMemoryRepository::new());
        let server = ReconServer::with_repository(config(), repo.clone()).unwrap();
        assert!(repo.store_ledger_config(&StoreId(7)).unwrap().is_some());
        assert!(server.state().repo.store_ledger_config(&StoreId(7)).unwrap().is_some());
    }

    #[tokio::test]
    async fn router_builds() {
        let server = ReconServer::new(config()).unwrap();
        let _router = server.router();
    }
}

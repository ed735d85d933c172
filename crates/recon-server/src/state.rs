use std::sync::Arc;

use tracing::info;

use recon_cascade::{AvoirWorkflow, DeliveryWorkflow};
use recon_ledger::{HttpLedgerClient, LedgerSource};
use recon_store::{InMemoryRepository, LedgerConfigRepository, Repository};
use recon_verify::{VerificationService, VerificationServiceConfig};

use crate::config::ReconConfig;
use crate::error::{ServerError, ServerResult};

/// Services shared by every handler. Built once at process start.
#[derive(Clone)]
pub struct AppState {
    /// Backend for collaborator entities and verification records.
    pub repo: Arc<dyn Repository>,
    pub verifier: Arc<VerificationService>,
    pub deliveries: Arc<DeliveryWorkflow>,
    pub avoirs: Arc<AvoirWorkflow>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        ledger: Arc<dyn LedgerSource>,
        config: VerificationServiceConfig,
    ) -> ServerResult<Self> {
        let verifier = Arc::new(
            VerificationService::new(repo.clone(), ledger, config)
                .map_err(|e| ServerError::Config(e.to_string()))?,
        );
        Ok(Self {
            deliveries: Arc::new(DeliveryWorkflow::new(repo.clone())),
            avoirs: Arc::new(AvoirWorkflow::new(repo.clone(), verifier.clone())),
            verifier,
            repo,
        })
    }

    /// Wire the production ledger client and an in-memory repository
    /// seeded with the configured store mappings.
    pub fn from_config(config: &ReconConfig) -> ServerResult<Self> {
        Self::with_repository(config, Arc::new(InMemoryRepository::new()))
    }

    /// Wire the production ledger client over a caller-supplied backend.
    /// Configured store mappings are written to `repo` first.
    pub fn with_repository(config: &ReconConfig, repo: Arc<dyn Repository>) -> ServerResult<Self> {
        for store in config.store_configs()? {
            repo.save_store_ledger_config(&store)?;
        }
        let ledger = HttpLedgerClient::new(config.ledger.clone())
            .map_err(|e| ServerError::Config(format!("ledger: {e}")))?;
        info!(stores = config.stores.len(), ledger = %config.ledger.base_url, "services ready");
        Self::new(repo, Arc::new(ledger), config.verification_config())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

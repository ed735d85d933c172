use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use recon_store::{AvoirRepository, Repository, SupplierRepository};
use recon_types::{Avoir, AvoirId, AvoirStatus, StoreId, SupplierId, VerificationResult};
use recon_verify::{VerificationRequest, VerificationService};

use crate::error::{CascadeError, CascadeResult};

/// Result of confirming one avoir in a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct AvoirConfirmation {
    pub avoir_id: AvoirId,
    pub result: VerificationResult,
}

/// Credit-note operations: ledger confirmation, the manual override,
/// devalidation and forward-only status changes.
pub struct AvoirWorkflow {
    repo: Arc<dyn Repository>,
    verifier: Arc<VerificationService>,
}

impl AvoirWorkflow {
    pub fn new(repo: Arc<dyn Repository>, verifier: Arc<VerificationService>) -> Self {
        Self { repo, verifier }
    }

    pub fn get(&self, id: &AvoirId) -> CascadeResult<Avoir> {
        self.repo
            .get_avoir(id)?
            .ok_or(CascadeError::AvoirNotFound(*id))
    }

    /// Verify the avoir's reference against its store ledger, with the avoir
    /// as record owner. Only a confirmed match backed by a stored
    /// verification record sets the verified flag; a match whose record
    /// could not be stored is [`CascadeError::Unrecorded`].
    #[instrument(skip(self), fields(avoir = %id))]
    pub async fn confirm_with_ledger(
        &self,
        id: &AvoirId,
        force_refresh: bool,
    ) -> CascadeResult<VerificationResult> {
        let avoir = self.get(id)?;
        let (store_id, reference) = verification_target(&avoir)?;
        let supplier = self.supplier_name(avoir.supplier_id);

        let mut request = VerificationRequest::invoice(store_id, reference)
            .with_owner(avoir.id)
            .forced(force_refresh);
        request.supplier_name = supplier;
        let verdict = self.verifier.run_recorded(&request).await;
        let result = verdict.result;

        if result.is_confirmed() {
            if !verdict.recorded {
                warn!("ledger match without a stored record, flag left untouched");
                return Err(CascadeError::Unrecorded(avoir.id));
            }
            self.set_verified(id, true)?;
        } else {
            debug!(
                indeterminate = result.is_indeterminate(),
                "avoir not confirmed, flag left untouched"
            );
        }
        Ok(result)
    }

    /// Administrative override: mark verified without a ledger match.
    pub fn mark_verified_manually(&self, id: &AvoirId) -> CascadeResult<Avoir> {
        let avoir = self.set_verified(id, true)?;
        info!(avoir = %id, "avoir marked verified manually");
        Ok(avoir)
    }

    /// Clear the verified flag. Verification records are kept.
    pub fn devalidate(&self, id: &AvoirId) -> CascadeResult<Avoir> {
        let avoir = self.set_verified(id, false)?;
        info!(avoir = %id, "avoir devalidated");
        Ok(avoir)
    }

    /// Move the avoir forward in its lifecycle. The current status is a
    /// no-op; an earlier one is rejected.
    pub fn advance_status(&self, id: &AvoirId, status: AvoirStatus) -> CascadeResult<Avoir> {
        let mut avoir = self.get(id)?;
        if status == avoir.status {
            return Ok(avoir);
        }
        if status < avoir.status {
            return Err(CascadeError::invalid_transition("avoir", avoir.status, status));
        }
        let from = avoir.status;
        avoir.status = status;
        self.repo.save_avoir(&avoir)?;
        info!(avoir = %id, %from, to = %status, "avoir status advanced");
        Ok(avoir)
    }

    /// Confirm every unverified avoir that has a reference, pacing ledger
    /// calls by `delay`. Avoirs without a reference or store are skipped.
    #[instrument(skip(self))]
    pub async fn confirm_pending(&self, delay: Duration) -> CascadeResult<Vec<AvoirConfirmation>> {
        let mut ids = Vec::new();
        let mut requests = Vec::new();
        for avoir in self.repo.list_avoirs()? {
            if avoir.nocodb_verified {
                continue;
            }
            let Ok((store_id, reference)) = verification_target(&avoir) else {
                continue;
            };
            let mut request = VerificationRequest::invoice(store_id, reference).with_owner(avoir.id);
            request.supplier_name = self.supplier_name(avoir.supplier_id);
            ids.push(avoir.id);
            requests.push(request);
        }

        let verdicts = self.verifier.verify_batch_recorded(&requests, delay).await;

        let mut confirmations = Vec::with_capacity(verdicts.len());
        for (avoir_id, verdict) in ids.into_iter().zip(verdicts) {
            if verdict.result.is_confirmed() {
                if !verdict.recorded {
                    warn!(avoir = %avoir_id, "ledger match without a stored record, flag left untouched");
                } else if let Err(e) = self.set_verified(&avoir_id, true) {
                    warn!(avoir = %avoir_id, error = %e, "failed to flag confirmed avoir");
                }
            }
            confirmations.push(AvoirConfirmation { avoir_id, result: verdict.result });
        }
        let confirmed = confirmations.iter().filter(|c| c.result.is_confirmed()).count();
        info!(checked = confirmations.len(), confirmed, "pending avoirs confirmed");
        Ok(confirmations)
    }

    fn set_verified(&self, id: &AvoirId, verified: bool) -> CascadeResult<Avoir> {
        let mut avoir = self.get(id)?;
        if avoir.nocodb_verified == verified {
            return Ok(avoir);
        }
        avoir.nocodb_verified = verified;
        avoir.nocodb_verified_at = verified.then(Utc::now);
        self.repo.save_avoir(&avoir)?;
        Ok(avoir)
    }

    /// Supplier name used in the cache key; unreadable suppliers are
    /// treated as unknown.
    fn supplier_name(&self, supplier_id: Option<SupplierId>) -> Option<String> {
        let id = supplier_id?;
        match self.repo.get_supplier(&id) {
            Ok(supplier) => supplier.map(|s| s.name),
            Err(e) => {
                warn!(supplier = %id, error = %e, "failed to read supplier");
                None
            }
        }
    }
}

impl std::fmt::Debug for AvoirWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvoirWorkflow")
            .field("verifier", &self.verifier)
            .finish()
    }
}

fn verification_target(avoir: &Avoir) -> CascadeResult<(StoreId, String)> {
    let reference = avoir
        .reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    match (avoir.store_id, reference) {
        (Some(store_id), Some(reference)) => Ok((store_id, reference.to_string())),
        _ => Err(CascadeError::MissingReference(avoir.id)),
    }
}

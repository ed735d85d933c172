use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use recon_ledger::{is_filter_safe, LedgerRecord, LedgerSource, SearchOutcome};
use recon_store::{LedgerConfigRepository, Repository, VerificationRecordRepository};
use recon_types::{
    LookupColumn, MatchType, OwnerId, StoreId, StoreLedgerConfig, VerificationMode,
    VerificationRecord, VerificationResult, BL_COLUMN_NOT_CONFIGURED, INVALID_REFERENCE,
    LEDGER_NOT_CONFIGURED,
};

use crate::cache::{CacheKey, VerificationCache};
use crate::config::VerificationServiceConfig;
use crate::error::VerifyError;

// ---------------------------------------------------------------------------
// VerificationRequest
// ---------------------------------------------------------------------------

/// One verification to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    /// Entity that receives a record on a confirmed match.
    pub owner: Option<OwnerId>,
    pub store_id: StoreId,
    pub reference: String,
    /// Part of the cache key only; the ledger is queried by reference.
    pub supplier_name: Option<String>,
    /// Skip the cache read (the fresh verdict is still cached).
    pub force_refresh: bool,
    pub mode: VerificationMode,
}

impl VerificationRequest {
    /// Invoice-reference lookup with BL fallback.
    pub fn invoice(store_id: StoreId, reference: impl Into<String>) -> Self {
        Self {
            owner: None,
            store_id,
            reference: reference.into(),
            supplier_name: None,
            force_refresh: false,
            mode: VerificationMode::Invoice,
        }
    }

    /// Delivery-slip lookup on the BL column only.
    pub fn bl(store_id: StoreId, bl_number: impl Into<String>) -> Self {
        Self {
            mode: VerificationMode::Bl,
            ..Self::invoice(store_id, bl_number)
        }
    }

    pub fn with_owner(mut self, owner: impl Into<OwnerId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_supplier(mut self, supplier_name: impl Into<String>) -> Self {
        self.supplier_name = Some(supplier_name.into());
        self
    }

    pub fn forced(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}

/// A verdict plus the state of the owner's record after the call.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub result: VerificationResult,
    /// The request's owner holds a confirmed record. Always `false` without
    /// an owner or without a confirmed match.
    pub recorded: bool,
}

/// How a verdict was produced; batches only pace calls that reached the
/// ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Local,
    Ledger,
}

// ---------------------------------------------------------------------------
// VerificationService
// ---------------------------------------------------------------------------

/// Answers "does this reference exist in the store's ledger?".
///
/// Pipeline: validate the reference, consult the cache, resolve the store's
/// ledger mapping, search the invoice column and then the BL column, cache
/// the errorless verdict, and persist a record for the owner on a confirmed
/// match.
///
/// Built once at process start and shared behind an `Arc`.
pub struct VerificationService {
    repo: Arc<dyn Repository>,
    ledger: Arc<dyn LedgerSource>,
    cache: VerificationCache,
    config: VerificationServiceConfig,
}

impl VerificationService {
    pub fn new(
        repo: Arc<dyn Repository>,
        ledger: Arc<dyn LedgerSource>,
        config: VerificationServiceConfig,
    ) -> Result<Self, VerifyError> {
        config.validate()?;
        Ok(Self {
            repo,
            ledger,
            cache: VerificationCache::new(config.cache_ttl()),
            config,
        })
    }

    pub fn config(&self) -> &VerificationServiceConfig {
        &self.config
    }

    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    /// Verify an invoice reference, falling back to the BL column.
    pub async fn verify(
        &self,
        owner: Option<OwnerId>,
        store_id: StoreId,
        reference: &str,
        supplier_name: Option<&str>,
        force_refresh: bool,
    ) -> VerificationResult {
        let request = VerificationRequest {
            owner,
            store_id,
            reference: reference.to_string(),
            supplier_name: supplier_name.map(str::to_string),
            force_refresh,
            mode: VerificationMode::Invoice,
        };
        self.run(&request).await
    }

    /// Verify a delivery-slip number against the BL column only.
    pub async fn verify_bl(
        &self,
        owner: Option<OwnerId>,
        store_id: StoreId,
        bl_number: &str,
        supplier_name: Option<&str>,
        force_refresh: bool,
    ) -> VerificationResult {
        let request = VerificationRequest {
            owner,
            store_id,
            reference: bl_number.to_string(),
            supplier_name: supplier_name.map(str::to_string),
            force_refresh,
            mode: VerificationMode::Bl,
        };
        self.run(&request).await
    }

    /// Owner-less invoice check.
    pub async fn verify_invoice(
        &self,
        reference: &str,
        store_id: StoreId,
        supplier_name: Option<&str>,
        force_refresh: bool,
    ) -> VerificationResult {
        self.verify(None, store_id, reference, supplier_name, force_refresh)
            .await
    }

    /// Run one request.
    pub async fn run(&self, request: &VerificationRequest) -> VerificationResult {
        self.execute(request).await.0.result
    }

    /// Run one request and report whether its owner ended up with a
    /// confirmed record.
    pub async fn run_recorded(&self, request: &VerificationRequest) -> Verdict {
        self.execute(request).await.0
    }

    /// Run requests one after another, pausing `batch_delay` before every
    /// ledger call but the first. Cache hits and rejected references do not
    /// wait. Results are in request order.
    pub async fn verify_batch(&self, requests: &[VerificationRequest]) -> Vec<VerificationResult> {
        self.verify_batch_paced(requests, self.config.batch_delay())
            .await
    }

    /// [`Self::verify_batch`] with an explicit pause.
    pub async fn verify_batch_paced(
        &self,
        requests: &[VerificationRequest],
        delay: Duration,
    ) -> Vec<VerificationResult> {
        self.verify_batch_recorded(requests, delay)
            .await
            .into_iter()
            .map(|verdict| verdict.result)
            .collect()
    }

    /// [`Self::verify_batch_paced`], keeping each owner's record state.
    pub async fn verify_batch_recorded(
        &self,
        requests: &[VerificationRequest],
        delay: Duration,
    ) -> Vec<Verdict> {
        let mut verdicts = Vec::with_capacity(requests.len());
        let mut called_ledger = false;

        for request in requests {
            if called_ledger && !delay.is_zero() && self.would_reach_ledger(request) {
                tokio::time::sleep(delay).await;
            }
            let (verdict, source) = self.execute(request).await;
            called_ledger |= source == Source::Ledger;
            verdicts.push(verdict);
        }

        debug!(count = verdicts.len(), "batch verification finished");
        verdicts
    }

    /// Whether `request` would miss every local short-cut.
    fn would_reach_ledger(&self, request: &VerificationRequest) -> bool {
        let Some(reference) = self.valid_reference(&request.reference) else {
            return false;
        };
        if request.force_refresh {
            return true;
        }
        let key = CacheKey::new(
            request.store_id,
            reference,
            request.supplier_name.as_deref(),
            request.mode,
        );
        self.cache.get(&key).is_none()
    }

    fn valid_reference<'a>(&self, reference: &'a str) -> Option<&'a str> {
        let trimmed = reference.trim();
        if trimmed.is_empty()
            || trimmed.chars().count() > self.config.max_reference_len
            || !is_filter_safe(trimmed)
        {
            None
        } else {
            Some(trimmed)
        }
    }

    #[instrument(
        name = "verify",
        skip(self, request),
        fields(store_id = %request.store_id, mode = %request.mode)
    )]
    async fn execute(&self, request: &VerificationRequest) -> (Verdict, Source) {
        let Some(reference) = self.valid_reference(&request.reference) else {
            debug!("reference rejected before lookup");
            return local(VerificationResult::indeterminate(INVALID_REFERENCE));
        };
        let supplier = request.supplier_name.as_deref();
        let key = CacheKey::new(request.store_id, reference, supplier, request.mode);

        if !request.force_refresh {
            if let Some(entry) = self.cache.get(&key) {
                let result = entry.to_result();
                debug!(exists = result.exists, match_type = %result.match_type, "cache hit");
                let recorded = self.record_confirmation(request, reference, &result);
                return (Verdict { result, recorded }, Source::Local);
            }
        }

        let config = match self.repo.store_ledger_config(&request.store_id) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("no ledger mapping for store");
                return local(VerificationResult::indeterminate(LEDGER_NOT_CONFIGURED));
            }
            Err(e) => {
                warn!(error = %e, "failed to load store ledger mapping");
                return local(VerificationResult::indeterminate(format!(
                    "ledger configuration unavailable: {e}"
                )));
            }
        };

        let columns: &[LookupColumn] = match request.mode {
            VerificationMode::Invoice => &[LookupColumn::InvoiceReference, LookupColumn::BlNumber],
            VerificationMode::Bl => {
                if config.columns.bl_column().is_none() {
                    debug!("bl lookup on a store without a bl column");
                    return local(VerificationResult::indeterminate(BL_COLUMN_NOT_CONFIGURED));
                }
                &[LookupColumn::BlNumber]
            }
        };

        let mut result = VerificationResult::absent();
        for &column in columns {
            if config.columns.column_for(column).is_none() {
                continue;
            }
            match self.ledger.search(&config, column, reference).await {
                Ok(SearchOutcome::Found(record)) => {
                    result = found_result(&config, column, &record);
                    break;
                }
                Ok(SearchOutcome::NotFound) => {
                    debug!(?column, "no match in column");
                }
                Err(e) => {
                    warn!(?column, kind = %e.kind(), error = %e, "ledger lookup failed");
                    let result = VerificationResult::indeterminate(e.to_string());
                    return (Verdict { result, recorded: false }, Source::Ledger);
                }
            }
        }

        debug!(exists = result.exists, match_type = %result.match_type, "ledger verdict");
        self.cache.store(key, &result);
        let recorded = self.record_confirmation(request, reference, &result);
        (Verdict { result, recorded }, Source::Ledger)
    }

    /// Persist a record for the request's owner on a confirmed match, unless
    /// the owner already has one. Failures never change the verdict; the
    /// return value says whether the owner holds a confirmed record.
    fn record_confirmation(
        &self,
        request: &VerificationRequest,
        reference: &str,
        result: &VerificationResult,
    ) -> bool {
        let Some(owner) = request.owner else {
            return false;
        };
        if !result.is_confirmed() {
            return false;
        }

        match self.repo.confirmed_record_for(&owner) {
            Ok(Some(_)) => {
                debug!(owner = %owner, "owner already has a confirmed record");
                return true;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(owner = %owner, error = %e, "failed to read verification records");
                return false;
            }
        }

        match self.repo.get_owner_entity(&owner) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(owner = %owner, "verification owner does not exist, record skipped");
                return false;
            }
            Err(e) => {
                warn!(owner = %owner, error = %e, "failed to resolve verification owner");
                return false;
            }
        }

        let record = VerificationRecord::from_result(
            owner,
            request.store_id,
            reference,
            request.supplier_name.clone(),
            result,
        );
        match self.repo.persist_verification_record(&record) {
            Ok(true) => {
                info!(owner = %owner, record = %record.id, "verification record persisted");
                true
            }
            Ok(false) => {
                debug!(owner = %owner, "concurrent verification already persisted a record");
                true
            }
            Err(e) => {
                warn!(owner = %owner, error = %e, "failed to persist verification record");
                false
            }
        }
    }
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

fn local(result: VerificationResult) -> (Verdict, Source) {
    (Verdict { result, recorded: false }, Source::Local)
}

fn found_result(
    config: &StoreLedgerConfig,
    column: LookupColumn,
    record: &LedgerRecord,
) -> VerificationResult {
    VerificationResult::found(
        MatchType::from(column),
        record.amount(config.columns.amount_column()),
        record.text(config.columns.supplier_column()),
    )
}

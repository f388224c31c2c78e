//! Expiry sweep: write off expired stock and report what is about to expire.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use brewery_catalog::{Beer, BeerId};
use brewery_events::{EventBus, EventEnvelope};
use brewery_inventory::{LossId, LossRecord, StockEvent};

use crate::catalog::{CatalogError, CatalogLookup};
use crate::ledger::{LedgerError, StockLedger};
use crate::record_store::RecordStore;
use crate::stock_store::StockStore;
use crate::workflows::LossRegistration;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SweepError {
    /// The candidate list could not be read; nothing was swept.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearedItem {
    pub beer_id: BeerId,
    pub name: String,
    pub expiration_date: NaiveDate,
    pub quantity_cleared: i64,
    /// Audit record of the write-off, when it could be stored.
    pub loss_id: Option<LossId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringItem {
    pub beer_id: BeerId,
    pub name: String,
    pub expiration_date: NaiveDate,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub beer_id: BeerId,
    pub error: String,
}

/// Outcome of one sweep. Item failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub reference_date: NaiveDate,
    pub cleared: Vec<ClearedItem>,
    pub total_cleared: i64,
    pub expiring_soon: Vec<ExpiringItem>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            cleared: Vec::new(),
            total_cleared: 0,
            expiring_soon: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, beer_id: BeerId, error: impl ToString) {
        self.failures.push(SweepFailure {
            beer_id,
            error: error.to_string(),
        });
    }
}

pub struct ExpirySweep<S, C, B, L> {
    ledger: Arc<StockLedger<S, C, B>>,
    losses: Arc<LossRegistration<S, C, B, L>>,
}

impl<S, C, B, L> ExpirySweep<S, C, B, L>
where
    S: StockStore,
    C: CatalogLookup,
    B: EventBus<EventEnvelope<StockEvent>>,
    L: RecordStore<LossId, LossRecord>,
{
    pub fn new(
        ledger: Arc<StockLedger<S, C, B>>,
        losses: Arc<LossRegistration<S, C, B, L>>,
    ) -> Self {
        Self { ledger, losses }
    }

    /// Clear every beer expired on `reference_date`.
    ///
    /// Idempotent: a second run on the same date finds nothing left to clear.
    pub fn run(&self, reference_date: NaiveDate) -> Result<SweepReport, SweepError> {
        let policy = *self.ledger.expiry_policy();
        let horizon = policy.warning_horizon(reference_date);
        let candidates = self.ledger.catalog().expiring_on_or_before(horizon)?;

        let mut report = SweepReport::new(reference_date);
        for beer in &candidates {
            if policy.is_expired(beer, reference_date) {
                self.clear(beer, reference_date, &mut report);
            } else if policy.is_near_expiry(beer, reference_date) {
                self.warn_expiring(beer, &mut report);
            }
        }

        info!(
            reference_date = %reference_date,
            cleared = report.cleared.len(),
            total_cleared = report.total_cleared,
            expiring_soon = report.expiring_soon.len(),
            failures = report.failures.len(),
            "expiry sweep finished"
        );
        Ok(report)
    }

    fn clear(&self, beer: &Beer, reference_date: NaiveDate, report: &mut SweepReport) {
        let beer_id = beer.id_typed();
        let Some(expiration_date) = beer.expiration_date() else {
            return;
        };

        let cleared = match self.ledger.clear_if_expired(beer_id, reference_date) {
            Ok(0) => return,
            Ok(n) => n,
            Err(LedgerError::NotFound(_)) => {
                debug!(beer_id = %beer_id, "expired beer has no stock record; skipped");
                return;
            }
            Err(e) => {
                warn!(beer_id = %beer_id, error = ?e, "failed to clear expired stock");
                report.fail(beer_id, e);
                return;
            }
        };

        let loss_id = match self.losses.record_expired(beer_id, cleared, reference_date) {
            Ok(record) => Some(record.id_typed()),
            Err(e) => {
                warn!(beer_id = %beer_id, quantity = cleared, error = ?e, "stock cleared but expiry loss not recorded");
                report.fail(beer_id, e);
                None
            }
        };

        report.total_cleared += cleared;
        report.cleared.push(ClearedItem {
            beer_id,
            name: beer.name().to_string(),
            expiration_date,
            quantity_cleared: cleared,
            loss_id,
        });
    }

    fn warn_expiring(&self, beer: &Beer, report: &mut SweepReport) {
        let beer_id = beer.id_typed();
        let Some(expiration_date) = beer.expiration_date() else {
            return;
        };

        match self.ledger.read(beer_id) {
            Ok(record) => report.expiring_soon.push(ExpiringItem {
                beer_id,
                name: beer.name().to_string(),
                expiration_date,
                quantity: record.quantity(),
            }),
            Err(LedgerError::NotFound(_)) => {}
            Err(e) => {
                warn!(beer_id = %beer_id, error = ?e, "failed to read stock of expiring beer");
                report.fail(beer_id, e);
            }
        }
    }
}

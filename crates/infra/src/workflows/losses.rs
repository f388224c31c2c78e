//! Loss registration: non-sale stock reductions with a reason code.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use brewery_catalog::BeerId;
use brewery_core::EntityId;
use brewery_events::{EventBus, EventEnvelope};
use brewery_inventory::{LossId, LossReason, LossRecord, StockError, StockEvent};

use crate::catalog::{CatalogError, CatalogLookup};
use crate::ledger::{LedgerError, StockLedger};
use crate::record_store::{RecordStore, RecordStoreError};
use crate::stock_store::StockStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossRequest {
    pub beer_id: BeerId,
    pub quantity: i64,
    pub reason: LossReason,
    pub loss_date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LossError {
    #[error("invalid quantity: {amount}")]
    InvalidAmount { amount: i64 },

    #[error("beer {0} not found")]
    BeerNotFound(BeerId),

    #[error("insufficient stock for beer {beer_id}: available {available}, requested {requested}")]
    InsufficientStock {
        beer_id: BeerId,
        available: i64,
        requested: i64,
    },

    #[error("loss record {0} not found")]
    LossNotFound(LossId),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Store(#[from] RecordStoreError),
}

impl From<LedgerError> for LossError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(beer_id)
            | LedgerError::Catalog(CatalogError::NotFound(beer_id)) => {
                LossError::BeerNotFound(beer_id)
            }
            LedgerError::InvalidAmount { amount } => LossError::InvalidAmount { amount },
            LedgerError::InsufficientStock {
                beer_id,
                available,
                requested,
            } => LossError::InsufficientStock {
                beer_id,
                available,
                requested,
            },
            other => LossError::Ledger(other),
        }
    }
}

impl From<StockError> for LossError {
    fn from(value: StockError) -> Self {
        match value {
            StockError::InvalidAmount { amount } => LossError::InvalidAmount { amount },
            StockError::InsufficientStock {
                beer_id,
                available,
                requested,
            } => LossError::InsufficientStock {
                beer_id,
                available,
                requested,
            },
            StockError::Overflow { .. } => LossError::InvalidAmount { amount: i64::MAX },
        }
    }
}

/// Records losses (breakage, theft, expiry) and takes the units out of stock.
pub struct LossRegistration<S, C, B, L> {
    ledger: Arc<StockLedger<S, C, B>>,
    losses: L,
}

impl<S, C, B, L> LossRegistration<S, C, B, L>
where
    S: StockStore,
    C: CatalogLookup,
    B: EventBus<EventEnvelope<StockEvent>>,
    L: RecordStore<LossId, LossRecord>,
{
    pub fn new(ledger: Arc<StockLedger<S, C, B>>, losses: L) -> Self {
        Self { ledger, losses }
    }

    pub fn register(&self, request: LossRequest) -> Result<LossRecord, LossError> {
        let LossRequest {
            beer_id,
            quantity,
            reason,
            loss_date,
            description,
        } = request;

        let record = LossRecord::new(
            LossId::new(EntityId::new()),
            beer_id,
            quantity,
            reason,
            description,
            loss_date,
            Utc::now(),
        )?;

        self.ledger
            .catalog()
            .resolve(beer_id)
            .map_err(LedgerError::from)?;

        // Early rejection for the common case; the ledger re-checks atomically.
        let available = self.ledger.read(beer_id)?.quantity();
        if quantity > available {
            info!(beer_id = %beer_id, available, requested = quantity, "loss rejected: more than on hand");
            return Err(LossError::InsufficientStock {
                beer_id,
                available,
                requested: quantity,
            });
        }

        self.ledger.decrease(beer_id, quantity)?;

        if let Err(e) = self.losses.insert(record.clone()) {
            warn!(beer_id = %beer_id, error = ?e, "loss record could not be stored; restoring stock");
            if let Err(restore) = self.ledger.increase(beer_id, quantity) {
                error!(beer_id = %beer_id, amount = quantity, error = ?restore, "failed to restore stock after aborted loss");
            }
            return Err(e.into());
        }

        info!(
            loss_id = %record.id_typed(),
            beer_id = %beer_id,
            quantity,
            reason = ?reason,
            "loss registered"
        );
        Ok(record)
    }

    /// Audit an expiry write-off whose stock effect the ledger already applied.
    pub(crate) fn record_expired(
        &self,
        beer_id: BeerId,
        quantity: i64,
        loss_date: NaiveDate,
    ) -> Result<LossRecord, LossError> {
        let record = LossRecord::new(
            LossId::new(EntityId::new()),
            beer_id,
            quantity,
            LossReason::Expired,
            "cleared by expiry sweep",
            loss_date,
            Utc::now(),
        )?;
        self.losses.insert(record.clone())?;
        Ok(record)
    }

    pub fn get(&self, loss_id: LossId) -> Result<LossRecord, LossError> {
        self.losses
            .get(&loss_id)?
            .ok_or(LossError::LossNotFound(loss_id))
    }

    pub fn list_for(&self, beer_id: BeerId) -> Result<Vec<LossRecord>, LossError> {
        Ok(self
            .losses
            .list()?
            .into_iter()
            .filter(|loss| loss.beer_id() == beer_id)
            .collect())
    }
}

//! Restock registration, correction and reversal.
//!
//! Edits of existing restock records apply only the difference between the old
//! and the new quantity, so sales made in between are never overwritten.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use brewery_catalog::BeerId;
use brewery_core::EntityId;
use brewery_events::{EventBus, EventEnvelope};
use brewery_inventory::{RestockId, RestockRecord, StockError, StockEvent};

use crate::catalog::{CatalogError, CatalogLookup};
use crate::ledger::{LedgerError, StockLedger};
use crate::record_store::{RecordStore, RecordStoreError};
use crate::stock_store::StockStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RestockError {
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

    #[error("restock record {0} not found")]
    RestockNotFound(RestockId),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Store(#[from] RecordStoreError),
}

impl From<LedgerError> for RestockError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(beer_id)
            | LedgerError::Catalog(CatalogError::NotFound(beer_id)) => {
                RestockError::BeerNotFound(beer_id)
            }
            LedgerError::InvalidAmount { amount } => RestockError::InvalidAmount { amount },
            LedgerError::InsufficientStock {
                beer_id,
                available,
                requested,
            } => RestockError::InsufficientStock {
                beer_id,
                available,
                requested,
            },
            other => RestockError::Ledger(other),
        }
    }
}

impl From<StockError> for RestockError {
    fn from(value: StockError) -> Self {
        match value {
            StockError::InvalidAmount { amount } => RestockError::InvalidAmount { amount },
            StockError::InsufficientStock {
                beer_id,
                available,
                requested,
            } => RestockError::InsufficientStock {
                beer_id,
                available,
                requested,
            },
            StockError::Overflow { .. } => RestockError::InvalidAmount { amount: i64::MAX },
        }
    }
}

/// Signed stock adjustment applied by a restock edit.
enum Adjustment {
    Increase(i64),
    Decrease(i64),
    None,
}

impl Adjustment {
    fn from_delta(delta: i64) -> Self {
        match delta {
            d if d > 0 => Adjustment::Increase(d),
            d if d < 0 => Adjustment::Decrease(-d),
            _ => Adjustment::None,
        }
    }

    fn inverse(&self) -> Self {
        match *self {
            Adjustment::Increase(n) => Adjustment::Decrease(n),
            Adjustment::Decrease(n) => Adjustment::Increase(n),
            Adjustment::None => Adjustment::None,
        }
    }
}

pub struct RestockRegistration<S, C, B, R> {
    ledger: Arc<StockLedger<S, C, B>>,
    restocks: R,
    /// Serializes edits so two corrections of one record never share an old quantity.
    edits: Mutex<()>,
}

impl<S, C, B, R> RestockRegistration<S, C, B, R>
where
    S: StockStore,
    C: CatalogLookup,
    B: EventBus<EventEnvelope<StockEvent>>,
    R: RecordStore<RestockId, RestockRecord>,
{
    pub fn new(ledger: Arc<StockLedger<S, C, B>>, restocks: R) -> Self {
        Self {
            ledger,
            restocks,
            edits: Mutex::new(()),
        }
    }

    pub fn register(&self, beer_id: BeerId, quantity: i64) -> Result<RestockRecord, RestockError> {
        let record = RestockRecord::new(RestockId::new(EntityId::new()), beer_id, quantity, Utc::now())?;

        self.ledger
            .catalog()
            .resolve(beer_id)
            .map_err(LedgerError::from)?;
        self.ledger.increase(beer_id, quantity)?;

        if let Err(e) = self.restocks.insert(record.clone()) {
            warn!(beer_id = %beer_id, error = ?e, "restock could not be stored; reverting stock");
            self.adjust_or_log(beer_id, Adjustment::Decrease(quantity));
            return Err(e.into());
        }

        info!(restock_id = %record.id_typed(), beer_id = %beer_id, quantity, "restock registered");
        Ok(record)
    }

    /// Correct the quantity of a past restock, applying only the difference.
    pub fn update(
        &self,
        restock_id: RestockId,
        new_quantity: i64,
    ) -> Result<RestockRecord, RestockError> {
        if new_quantity <= 0 {
            return Err(RestockError::InvalidAmount {
                amount: new_quantity,
            });
        }

        let _guard = self.edits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = self.get(restock_id)?;
        let updated = current.with_quantity(new_quantity)?;
        let beer_id = current.beer_id();
        let adjustment = Adjustment::from_delta(current.delta_to(new_quantity));

        self.adjust(beer_id, &adjustment)?;

        if let Err(e) = self.restocks.update(updated.clone()) {
            warn!(restock_id = %restock_id, error = ?e, "restock edit could not be stored; reverting stock");
            self.adjust_or_log(beer_id, adjustment.inverse());
            return Err(e.into());
        }

        info!(
            restock_id = %restock_id,
            beer_id = %beer_id,
            from = current.quantity(),
            to = new_quantity,
            "restock corrected"
        );
        Ok(updated)
    }

    /// Administrative override: take the restocked units back out and drop the record.
    pub fn delete(&self, restock_id: RestockId) -> Result<RestockRecord, RestockError> {
        let _guard = self.edits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = self.get(restock_id)?;
        let beer_id = current.beer_id();
        self.ledger.decrease(beer_id, current.quantity())?;

        match self.restocks.remove(&restock_id) {
            Ok(removed) => {
                info!(restock_id = %restock_id, beer_id = %beer_id, quantity = removed.quantity(), "restock deleted");
                Ok(removed)
            }
            Err(e) => {
                warn!(restock_id = %restock_id, error = ?e, "restock could not be removed; restoring stock");
                self.adjust_or_log(beer_id, Adjustment::Increase(current.quantity()));
                Err(e.into())
            }
        }
    }

    pub fn get(&self, restock_id: RestockId) -> Result<RestockRecord, RestockError> {
        self.restocks
            .get(&restock_id)?
            .ok_or(RestockError::RestockNotFound(restock_id))
    }

    pub fn list_for(&self, beer_id: BeerId) -> Result<Vec<RestockRecord>, RestockError> {
        Ok(self
            .restocks
            .list()?
            .into_iter()
            .filter(|restock| restock.beer_id() == beer_id)
            .collect())
    }

    fn adjust(&self, beer_id: BeerId, adjustment: &Adjustment) -> Result<(), LedgerError> {
        match *adjustment {
            Adjustment::Increase(n) => self.ledger.increase(beer_id, n).map(|_| ()),
            Adjustment::Decrease(n) => self.ledger.decrease(beer_id, n).map(|_| ()),
            Adjustment::None => Ok(()),
        }
    }

    fn adjust_or_log(&self, beer_id: BeerId, adjustment: Adjustment) {
        if let Err(e) = self.adjust(beer_id, &adjustment) {
            error!(beer_id = %beer_id, error = ?e, "failed to revert restock stock adjustment");
        }
    }
}

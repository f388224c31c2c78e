use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brewery_catalog::BeerId;
use brewery_core::{DomainError, Entity};

use crate::classifier::StatusClassifier;
use crate::error::StockError;

/// Stock status tier, derived from the on-hand quantity.
///
/// Variants are declared from least to most stocked so the derived ordering
/// follows quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Low,
    Available,
}

impl StockStatus {
    /// Stable storage code.
    pub fn code(self) -> i32 {
        match self {
            StockStatus::Available => 1,
            StockStatus::Low => 2,
            StockStatus::OutOfStock => 3,
        }
    }
}

impl TryFrom<i32> for StockStatus {
    type Error = DomainError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(StockStatus::Available),
            2 => Ok(StockStatus::Low),
            3 => Ok(StockStatus::OutOfStock),
            other => Err(DomainError::unknown_code("stock status", other)),
        }
    }
}

/// On-hand stock of one beer.
///
/// The record shares its identity with the beer it tracks. `status` is a cached
/// projection of `quantity` and only ever changes together with it; `version`
/// increases by one with every mutation and backs optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRecord {
    beer_id: BeerId,
    quantity: i64,
    status: StockStatus,
    last_update: DateTime<Utc>,
    version: u64,
}

impl StockRecord {
    /// Open the stock record of a newly registered beer (version 1).
    pub fn open(
        beer_id: BeerId,
        quantity: i64,
        classifier: &StatusClassifier,
        at: DateTime<Utc>,
    ) -> Result<Self, StockError> {
        if quantity < 0 {
            return Err(StockError::InvalidAmount { amount: quantity });
        }

        Ok(Self {
            beer_id,
            quantity,
            status: classifier.classify(quantity),
            last_update: at,
            version: 1,
        })
    }

    pub fn beer_id(&self) -> BeerId {
        self.beer_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_supply(&self, amount: i64) -> bool {
        amount <= self.quantity
    }

    /// Remove `amount` units (sale or loss).
    pub fn decrease(
        &self,
        amount: i64,
        classifier: &StatusClassifier,
        at: DateTime<Utc>,
    ) -> Result<Self, StockError> {
        if amount <= 0 {
            return Err(StockError::InvalidAmount { amount });
        }
        if !self.can_supply(amount) {
            return Err(StockError::InsufficientStock {
                beer_id: self.beer_id,
                available: self.quantity,
                requested: amount,
            });
        }

        Ok(self.next(self.quantity - amount, classifier, at))
    }

    /// Add `amount` units (restock).
    pub fn increase(
        &self,
        amount: i64,
        classifier: &StatusClassifier,
        at: DateTime<Utc>,
    ) -> Result<Self, StockError> {
        if amount <= 0 {
            return Err(StockError::InvalidAmount { amount });
        }
        let quantity = self
            .quantity
            .checked_add(amount)
            .ok_or(StockError::Overflow {
                beer_id: self.beer_id,
            })?;

        Ok(self.next(quantity, classifier, at))
    }

    /// Drop the whole quantity (expiry).
    pub fn clear(&self, classifier: &StatusClassifier, at: DateTime<Utc>) -> Self {
        self.next(0, classifier, at)
    }

    fn next(&self, quantity: i64, classifier: &StatusClassifier, at: DateTime<Utc>) -> Self {
        Self {
            beer_id: self.beer_id,
            quantity,
            status: classifier.classify(quantity),
            last_update: at,
            version: self.version + 1,
        }
    }
}

impl Entity for StockRecord {
    type Id = BeerId;

    fn id(&self) -> &Self::Id {
        &self.beer_id
    }
}

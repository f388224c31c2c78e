use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use brewery_catalog::BeerId;
use brewery_core::{DomainError, Entity, EntityId};

use crate::error::StockError;

/// Stock loss identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LossId(pub EntityId);

impl LossId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LossId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Why units left stock without being sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    Damaged,
    Expired,
    Theft,
    Other,
}

impl LossReason {
    /// Stable storage code.
    pub fn code(self) -> i32 {
        match self {
            LossReason::Damaged => 1,
            LossReason::Expired => 2,
            LossReason::Theft => 3,
            LossReason::Other => 4,
        }
    }
}

impl TryFrom<i32> for LossReason {
    type Error = DomainError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(LossReason::Damaged),
            2 => Ok(LossReason::Expired),
            3 => Ok(LossReason::Theft),
            4 => Ok(LossReason::Other),
            other => Err(DomainError::unknown_code("loss reason", other)),
        }
    }
}

/// Immutable audit record of a non-sale stock reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossRecord {
    id: LossId,
    beer_id: BeerId,
    quantity: i64,
    reason: LossReason,
    description: String,
    loss_date: NaiveDate,
    registered_at: DateTime<Utc>,
}

impl LossRecord {
    pub fn new(
        id: LossId,
        beer_id: BeerId,
        quantity: i64,
        reason: LossReason,
        description: impl Into<String>,
        loss_date: NaiveDate,
        registered_at: DateTime<Utc>,
    ) -> Result<Self, StockError> {
        if quantity <= 0 {
            return Err(StockError::InvalidAmount { amount: quantity });
        }

        Ok(Self {
            id,
            beer_id,
            quantity,
            reason,
            description: description.into().trim().to_string(),
            loss_date,
            registered_at,
        })
    }

    pub fn id_typed(&self) -> LossId {
        self.id
    }

    pub fn beer_id(&self) -> BeerId {
        self.beer_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reason(&self) -> LossReason {
        self.reason
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn loss_date(&self) -> NaiveDate {
        self.loss_date
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

impl Entity for LossRecord {
    type Id = LossId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

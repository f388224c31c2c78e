use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use brewery_core::{DomainError, DomainResult, Entity, EntityId};

use crate::category::CategoryId;

/// Beer identifier.
///
/// Stock records reuse this identifier: a beer and its stock record share one
/// identity and are joined by lookup, never by reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeerId(pub EntityId);

impl BeerId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BeerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Catalog item: a sellable beer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beer {
    id: BeerId,
    name: String,
    category_id: CategoryId,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
    expiration_date: Option<NaiveDate>,
}

impl Beer {
    pub fn new(
        id: BeerId,
        name: impl Into<String>,
        category_id: CategoryId,
        price: u64,
        expiration_date: Option<NaiveDate>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("beer name cannot be empty"));
        }
        if price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }

        Ok(Self {
            id,
            name: name.trim().to_string(),
            category_id,
            price,
            expiration_date,
        })
    }

    pub fn id_typed(&self) -> BeerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn expiration_date(&self) -> Option<NaiveDate> {
        self.expiration_date
    }

    /// Reprice the beer. Orders already placed keep the price they captured.
    pub fn with_price(&self, price: u64) -> DomainResult<Self> {
        if price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        Ok(Self {
            price,
            ..self.clone()
        })
    }
}

impl Entity for Beer {
    type Id = BeerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brewery_catalog::BeerId;
use brewery_core::{Entity, EntityId};

use crate::error::StockError;

/// Restock identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestockId(pub EntityId);

impl RestockId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RestockId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Audit record of units added to stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockRecord {
    id: RestockId,
    beer_id: BeerId,
    quantity: i64,
    moment: DateTime<Utc>,
}

impl RestockRecord {
    pub fn new(
        id: RestockId,
        beer_id: BeerId,
        quantity: i64,
        moment: DateTime<Utc>,
    ) -> Result<Self, StockError> {
        if quantity <= 0 {
            return Err(StockError::InvalidAmount { amount: quantity });
        }
        Ok(Self {
            id,
            beer_id,
            quantity,
            moment,
        })
    }

    pub fn id_typed(&self) -> RestockId {
        self.id
    }

    pub fn beer_id(&self) -> BeerId {
        self.beer_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn moment(&self) -> DateTime<Utc> {
        self.moment
    }

    /// Stock adjustment needed to move from this record's quantity to `quantity`.
    pub fn delta_to(&self, quantity: i64) -> i64 {
        quantity - self.quantity
    }

    pub fn with_quantity(&self, quantity: i64) -> Result<Self, StockError> {
        Self::new(self.id, self.beer_id, quantity, self.moment)
    }
}

impl Entity for RestockRecord {
    type Id = RestockId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(quantity: i64) -> RestockRecord {
        RestockRecord::new(
            RestockId::new(EntityId::new()),
            BeerId::new(EntityId::new()),
            quantity,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn quantity_must_be_positive() {
        let err = RestockRecord::new(
            RestockId::new(EntityId::new()),
            BeerId::new(EntityId::new()),
            -2,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, StockError::InvalidAmount { amount: -2 });
    }

    #[test]
    fn delta_is_signed_difference() {
        let record = test_record(40);
        assert_eq!(record.delta_to(55), 15);
        assert_eq!(record.delta_to(25), -15);
        assert_eq!(record.delta_to(40), 0);
    }

    #[test]
    fn with_quantity_keeps_identity_and_moment() {
        let record = test_record(40);
        let edited = record.with_quantity(12).unwrap();

        assert_eq!(edited.id_typed(), record.id_typed());
        assert_eq!(edited.beer_id(), record.beer_id());
        assert_eq!(edited.moment(), record.moment());
        assert_eq!(edited.quantity(), 12);
        assert!(record.with_quantity(0).is_err());
    }
}

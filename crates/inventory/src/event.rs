use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brewery_catalog::BeerId;
use brewery_events::Event;

use crate::stock::StockStatus;

/// Event: StockOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOpened {
    pub beer_id: BeerId,
    pub quantity: i64,
    pub status: StockStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockDecreased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecreased {
    pub beer_id: BeerId,
    pub amount: i64,
    pub quantity: i64,
    pub status: StockStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIncreased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIncreased {
    pub beer_id: BeerId,
    pub amount: i64,
    pub quantity: i64,
    pub status: StockStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockCleared (expired units written off).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCleared {
    pub beer_id: BeerId,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    StockOpened(StockOpened),
    StockDecreased(StockDecreased),
    StockIncreased(StockIncreased),
    StockCleared(StockCleared),
}

impl StockEvent {
    pub fn beer_id(&self) -> BeerId {
        match self {
            StockEvent::StockOpened(e) => e.beer_id,
            StockEvent::StockDecreased(e) => e.beer_id,
            StockEvent::StockIncreased(e) => e.beer_id,
            StockEvent::StockCleared(e) => e.beer_id,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockOpened(_) => "inventory.stock.opened",
            StockEvent::StockDecreased(_) => "inventory.stock.decreased",
            StockEvent::StockIncreased(_) => "inventory.stock.increased",
            StockEvent::StockCleared(_) => "inventory.stock.cleared",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::StockOpened(e) => e.occurred_at,
            StockEvent::StockDecreased(e) => e.occurred_at,
            StockEvent::StockIncreased(e) => e.occurred_at,
            StockEvent::StockCleared(e) => e.occurred_at,
        }
    }
}

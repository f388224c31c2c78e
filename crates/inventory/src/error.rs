use thiserror::Error;

use brewery_catalog::BeerId;

/// Stock rule violation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// A mutation amount was zero or negative (or a negative opening quantity).
    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    /// The requested decrement exceeds the quantity on hand.
    #[error("insufficient stock for beer {beer_id}: available {available}, requested {requested}")]
    InsufficientStock {
        beer_id: BeerId,
        available: i64,
        requested: i64,
    },

    /// The resulting quantity would not fit the quantity type.
    #[error("stock quantity overflow for beer {beer_id}")]
    Overflow { beer_id: BeerId },
}

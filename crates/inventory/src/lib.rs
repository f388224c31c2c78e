//! Inventory domain module: stock levels and their audit records.
//!
//! This crate contains business rules for stock, implemented purely as
//! deterministic domain logic (no IO, no locking, no storage). Every mutation
//! returns a new [`StockRecord`]; making the read-modify-write atomic is the
//! job of the ledger in `brewery-infra`.

pub mod classifier;
pub mod error;
pub mod event;
pub mod loss;
pub mod restock;
pub mod stock;

pub use classifier::StatusClassifier;
pub use error::StockError;
pub use event::{StockCleared, StockDecreased, StockEvent, StockIncreased, StockOpened};
pub use loss::{LossId, LossReason, LossRecord};
pub use restock::{RestockId, RestockRecord};
pub use stock::{StockRecord, StockStatus};

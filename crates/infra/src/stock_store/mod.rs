//! Stock persistence boundary.
//!
//! Defines how the ledger loads and saves stock records under per-row
//! optimistic concurrency, without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use r#trait::{StockStore, StockStoreError};

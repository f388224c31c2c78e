//! Infrastructure layer: persistence boundaries, the stock ledger, workflows,
//! batch jobs, configuration and service wiring.

pub mod catalog;
pub mod config;
pub mod jobs;
pub mod ledger;
pub mod record_store;
pub mod services;
pub mod stock_store;
pub mod workflows;


pub use catalog::{CatalogError, CatalogLookup, InMemoryCatalog};
pub use config::BreweryConfig;
pub use ledger::{LedgerError, MovementKind, StockLedger, StockMovement};
pub use record_store::{InMemoryRecordStore, RecordStore, RecordStoreError};
pub use services::BreweryServices;
pub use stock_store::{InMemoryStockStore, StockStore, StockStoreError};

//! Service wiring: in-memory stores, bus, ledger and workflows behind `Arc`s.

use std::io;
use std::sync::Arc;

use tracing::{info, warn};

use brewery_catalog::{Beer, BeerId};
use brewery_events::{EventEnvelope, InMemoryEventBus};
use brewery_inventory::{LossId, LossRecord, RestockId, RestockRecord, StockEvent, StockRecord};
use brewery_sales::{Order, OrderId};

use crate::catalog::InMemoryCatalog;
use crate::config::BreweryConfig;
use crate::jobs::{ExpirySweep, ExpirySweepRunner, ExpirySweepRunnerHandle, SweepReportSink};
use crate::ledger::{LedgerError, StockLedger};
use crate::record_store::InMemoryRecordStore;
use crate::stock_store::InMemoryStockStore;
use crate::workflows::{LossRegistration, OrderFulfillment, RestockRegistration};

pub type StockEventBus = InMemoryEventBus<EventEnvelope<StockEvent>>;

type Store = Arc<InMemoryStockStore>;
type Catalog = Arc<InMemoryCatalog>;
type Bus = Arc<StockEventBus>;

pub type InMemoryLedger = StockLedger<Store, Catalog, Bus>;
pub type InMemoryFulfillment =
    OrderFulfillment<Store, Catalog, Bus, Arc<InMemoryRecordStore<OrderId, Order>>>;
pub type InMemoryLosses =
    LossRegistration<Store, Catalog, Bus, Arc<InMemoryRecordStore<LossId, LossRecord>>>;
pub type InMemoryRestocks =
    RestockRegistration<Store, Catalog, Bus, Arc<InMemoryRecordStore<RestockId, RestockRecord>>>;
pub type InMemorySweep =
    ExpirySweep<Store, Catalog, Bus, Arc<InMemoryRecordStore<LossId, LossRecord>>>;

/// Everything a single-process back-office needs, sharing one stock store.
pub struct BreweryServices {
    pub config: BreweryConfig,
    pub catalog: Arc<InMemoryCatalog>,
    pub bus: Arc<StockEventBus>,
    pub ledger: Arc<InMemoryLedger>,
    pub orders: Arc<InMemoryFulfillment>,
    pub losses: Arc<InMemoryLosses>,
    pub restocks: Arc<InMemoryRestocks>,
    pub sweep: Arc<InMemorySweep>,
}

impl BreweryServices {
    pub fn in_memory(config: BreweryConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let bus: Arc<StockEventBus> = Arc::new(InMemoryEventBus::new());
        let ledger = Arc::new(
            StockLedger::new(Arc::new(InMemoryStockStore::new()), catalog.clone(), bus.clone())
                .with_classifier(config.classifier())
                .with_expiry_policy(config.expiry_policy())
                .with_max_conflict_retries(config.max_conflict_retries),
        );

        let orders = Arc::new(OrderFulfillment::new(
            ledger.clone(),
            Arc::new(InMemoryRecordStore::new()),
        ));
        let losses = Arc::new(LossRegistration::new(
            ledger.clone(),
            Arc::new(InMemoryRecordStore::new()),
        ));
        let restocks = Arc::new(RestockRegistration::new(
            ledger.clone(),
            Arc::new(InMemoryRecordStore::new()),
        ));
        let sweep = Arc::new(ExpirySweep::new(ledger.clone(), losses.clone()));

        info!(
            low_stock_threshold = config.low_stock_threshold,
            max_conflict_retries = config.max_conflict_retries,
            expiry_warning_days = config.expiry_warning_days,
            "in-memory brewery services ready"
        );

        Self {
            config,
            catalog,
            bus,
            ledger,
            orders,
            losses,
            restocks,
            sweep,
        }
    }

    /// Add a beer to the catalog and open its stock record.
    ///
    /// The catalog entry is rolled back if the stock record cannot be opened.
    pub fn register_beer(
        &self,
        beer: Beer,
        initial_quantity: i64,
    ) -> Result<StockRecord, LedgerError> {
        let beer_id = beer.id_typed();
        self.catalog.insert_beer(beer)?;

        match self.ledger.open(beer_id, initial_quantity) {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(rollback) = self.catalog.remove_beer(beer_id) {
                    warn!(beer_id = %beer_id, error = ?rollback, "failed to roll back catalog entry");
                }
                Err(e)
            }
        }
    }

    /// Remove a beer from the catalog together with its stock record.
    pub fn remove_beer(&self, beer_id: BeerId) -> Result<Beer, LedgerError> {
        match self.ledger.remove(beer_id) {
            Ok(_) | Err(LedgerError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let beer = self.catalog.remove_beer(beer_id)?;
        info!(beer_id = %beer_id, "beer removed from catalog");
        Ok(beer)
    }

    /// Start the scheduled expiry sweep with the configured interval.
    pub fn spawn_sweep_runner<K: SweepReportSink>(
        &self,
        sink: Arc<K>,
    ) -> io::Result<ExpirySweepRunnerHandle> {
        ExpirySweepRunner::default()
            .with_interval(self.config.sweep_interval)
            .spawn("expiry-sweep", self.sweep.clone(), sink)
    }
}

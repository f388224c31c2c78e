//! Order placement: validate every line, then decrement all or nothing.
//!
//! Flow:
//! 1. Reject empty orders and non-positive quantities
//! 2. Resolve every beer through the catalog and capture its current price
//! 3. `StockLedger::decrease_many` (all rows or none)
//! 4. Persist the order
//!
//! Compensating action: if the order cannot be persisted after stock was
//! committed, every decrement is reversed through `StockLedger::increase`.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use brewery_catalog::BeerId;
use brewery_core::{ClientId, DomainError, EntityId};
use brewery_events::{EventBus, EventEnvelope};
use brewery_inventory::StockEvent;
use brewery_sales::{Order, OrderId, OrderLine, OrderStatus};

use crate::catalog::{CatalogError, CatalogLookup};
use crate::ledger::{LedgerError, StockLedger, StockMovement};
use crate::record_store::{RecordStore, RecordStoreError};
use crate::stock_store::StockStore;

/// One requested line of an order, before prices are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub beer_id: BeerId,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(beer_id: BeerId, quantity: i64) -> Self {
        Self { beer_id, quantity }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FulfillmentError {
    #[error("order has no lines")]
    EmptyOrder,

    #[error("invalid quantity: {amount}")]
    InvalidAmount { amount: i64 },

    #[error("beer {0} not found")]
    ItemNotFound(BeerId),

    #[error("insufficient stock for beer {beer_id}: available {available}, requested {requested}")]
    InsufficientStock {
        beer_id: BeerId,
        available: i64,
        requested: i64,
    },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Catalog(CatalogError),

    #[error(transparent)]
    Store(#[from] RecordStoreError),
}

impl From<CatalogError> for FulfillmentError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound(beer_id) => FulfillmentError::ItemNotFound(beer_id),
            other => FulfillmentError::Catalog(other),
        }
    }
}

impl From<LedgerError> for FulfillmentError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(beer_id) => FulfillmentError::ItemNotFound(beer_id),
            LedgerError::InvalidAmount { amount } => FulfillmentError::InvalidAmount { amount },
            LedgerError::InsufficientStock {
                beer_id,
                available,
                requested,
            } => FulfillmentError::InsufficientStock {
                beer_id,
                available,
                requested,
            },
            LedgerError::Catalog(e) => e.into(),
            other => FulfillmentError::Ledger(other),
        }
    }
}

/// Places orders against shared stock and tracks their lifecycle.
pub struct OrderFulfillment<S, C, B, O> {
    ledger: Arc<StockLedger<S, C, B>>,
    orders: O,
}

impl<S, C, B, O> OrderFulfillment<S, C, B, O>
where
    S: StockStore,
    C: CatalogLookup,
    B: EventBus<EventEnvelope<StockEvent>>,
    O: RecordStore<OrderId, Order>,
{
    pub fn new(ledger: Arc<StockLedger<S, C, B>>, orders: O) -> Self {
        Self { ledger, orders }
    }

    pub fn place(&self, client_id: ClientId, lines: &[LineRequest]) -> Result<Order, FulfillmentError> {
        if lines.is_empty() {
            return Err(FulfillmentError::EmptyOrder);
        }
        if let Some(bad) = lines.iter().find(|line| line.quantity <= 0) {
            return Err(FulfillmentError::InvalidAmount {
                amount: bad.quantity,
            });
        }

        // Prices are captured now; later catalog edits never reach this order.
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let beer = self.ledger.catalog().resolve(line.beer_id)?;
            priced.push(OrderLine {
                beer_id: line.beer_id,
                quantity: line.quantity,
                unit_price: beer.price(),
            });
        }

        let order = Order::place(OrderId::new(EntityId::new()), client_id, priced, Utc::now())?;

        let demand: Vec<(BeerId, i64)> = lines.iter().map(|l| (l.beer_id, l.quantity)).collect();
        let movements = self.ledger.decrease_many(&demand).map_err(|e| {
            if e.is_rejection() {
                info!(client_id = %client_id, error = %e, "order rejected");
            } else {
                warn!(client_id = %client_id, error = ?e, "order stock commit failed");
            }
            FulfillmentError::from(e)
        })?;

        if let Err(e) = self.orders.insert(order.clone()) {
            warn!(order_id = %order.id_typed(), error = ?e, "order could not be stored; restoring stock");
            self.compensate(&movements);
            return Err(e.into());
        }

        info!(
            order_id = %order.id_typed(),
            client_id = %client_id,
            lines = order.lines().len(),
            total = order.total(),
            "order placed"
        );
        Ok(order)
    }

    pub fn get(&self, order_id: OrderId) -> Result<Order, FulfillmentError> {
        self.orders
            .get(&order_id)?
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }

    pub fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Order>, FulfillmentError> {
        Ok(self
            .orders
            .list()?
            .into_iter()
            .filter(|order| order.client_id() == client_id)
            .collect())
    }

    /// Move an order along its lifecycle. Never touches stock.
    pub fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, FulfillmentError> {
        let current = self.get(order_id)?;
        let next = current.transition(status)?;
        self.orders.update(next.clone())?;

        info!(order_id = %order_id, from = ?current.status(), to = ?status, "order status changed");
        Ok(next)
    }

    fn compensate(&self, movements: &[StockMovement]) {
        for movement in movements {
            if let Err(e) = self.ledger.increase(movement.beer_id, movement.amount) {
                error!(
                    beer_id = %movement.beer_id,
                    amount = movement.amount,
                    error = ?e,
                    "failed to restore stock after aborted order"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewery_catalog::{Beer, Category, CategoryId};
    use brewery_events::InMemoryEventBus;

    use crate::catalog::InMemoryCatalog;
    use crate::record_store::InMemoryRecordStore;
    use crate::stock_store::InMemoryStockStore;

    type TestLedger = StockLedger<
        Arc<InMemoryStockStore>,
        Arc<InMemoryCatalog>,
        Arc<InMemoryEventBus<EventEnvelope<StockEvent>>>,
    >;

    struct Fixture {
        ledger: Arc<TestLedger>,
        catalog: Arc<InMemoryCatalog>,
        category_id: CategoryId,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = Arc::new(InMemoryCatalog::new());
            let category_id = CategoryId::new(EntityId::new());
            catalog
                .insert_category(Category::new(category_id, "Stout").unwrap())
                .unwrap();
            let ledger = Arc::new(StockLedger::new(
                Arc::new(InMemoryStockStore::new()),
                catalog.clone(),
                Arc::new(InMemoryEventBus::new()),
            ));
            Self {
                ledger,
                catalog,
                category_id,
            }
        }

        fn beer(&self, price: u64, quantity: i64) -> BeerId {
            let beer_id = BeerId::new(EntityId::new());
            self.catalog
                .insert_beer(Beer::new(beer_id, "Porter", self.category_id, price, None).unwrap())
                .unwrap();
            self.ledger.open(beer_id, quantity).unwrap();
            beer_id
        }

        fn fulfillment<O: RecordStore<OrderId, Order>>(
            &self,
            orders: O,
        ) -> OrderFulfillment<
            Arc<InMemoryStockStore>,
            Arc<InMemoryCatalog>,
            Arc<InMemoryEventBus<EventEnvelope<StockEvent>>>,
            O,
        > {
            OrderFulfillment::new(self.ledger.clone(), orders)
        }
    }

    #[test]
    fn place_decrements_stock_and_totals_lines() {
        let fx = Fixture::new();
        let a = fx.beer(450, 20);
        let b = fx.beer(1_000, 5);
        let fulfillment = fx.fulfillment(InMemoryRecordStore::new());
        let client_id = ClientId::new();

        let order = fulfillment
            .place(client_id, &[LineRequest::new(a, 2), LineRequest::new(b, 3)])
            .unwrap();

        assert_eq!(order.status(), OrderStatus::WaitingPayment);
        assert_eq!(order.total(), 2 * 450 + 3 * 1_000);
        assert_eq!(fx.ledger.read(a).unwrap().quantity(), 18);
        assert_eq!(fx.ledger.read(b).unwrap().quantity(), 2);
        assert_eq!(fulfillment.get(order.id_typed()).unwrap(), order);
        assert_eq!(fulfillment.list_for_client(client_id).unwrap().len(), 1);
    }

    #[test]
    fn empty_and_non_positive_orders_are_rejected() {
        let fx = Fixture::new();
        let a = fx.beer(450, 20);
        let fulfillment = fx.fulfillment(InMemoryRecordStore::new());

        assert_eq!(
            fulfillment.place(ClientId::new(), &[]).unwrap_err(),
            FulfillmentError::EmptyOrder
        );
        assert_eq!(
            fulfillment
                .place(ClientId::new(), &[LineRequest::new(a, 1), LineRequest::new(a, 0)])
                .unwrap_err(),
            FulfillmentError::InvalidAmount { amount: 0 }
        );
        assert_eq!(fx.ledger.read(a).unwrap().quantity(), 20);
    }

    #[test]
    fn unknown_beer_fails_the_whole_order() {
        let fx = Fixture::new();
        let a = fx.beer(450, 20);
        let unknown = BeerId::new(EntityId::new());
        let fulfillment = fx.fulfillment(InMemoryRecordStore::new());

        let err = fulfillment
            .place(ClientId::new(), &[LineRequest::new(a, 1), LineRequest::new(unknown, 1)])
            .unwrap_err();
        assert_eq!(err, FulfillmentError::ItemNotFound(unknown));
        assert_eq!(fx.ledger.read(a).unwrap().quantity(), 20);
    }

    #[test]
    fn status_lifecycle_never_touches_stock() {
        let fx = Fixture::new();
        let a = fx.beer(450, 20);
        let fulfillment = fx.fulfillment(InMemoryRecordStore::new());
        let order = fulfillment
            .place(ClientId::new(), &[LineRequest::new(a, 4)])
            .unwrap();

        let canceled = fulfillment
            .update_status(order.id_typed(), OrderStatus::Canceled)
            .unwrap();
        assert_eq!(canceled.status(), OrderStatus::Canceled);
        assert_eq!(fx.ledger.read(a).unwrap().quantity(), 16);

        match fulfillment.update_status(order.id_typed(), OrderStatus::Paid) {
            Err(FulfillmentError::Domain(DomainError::InvariantViolation(_))) => {}
            other => panic!("expected invalid transition, got {other:?}"),
        }

        let missing = OrderId::new(EntityId::new());
        assert_eq!(
            fulfillment.get(missing).unwrap_err(),
            FulfillmentError::OrderNotFound(missing)
        );
    }

    /// Order store that refuses every write.
    struct BrokenOrders;

    impl RecordStore<OrderId, Order> for BrokenOrders {
        fn get(&self, _key: &OrderId) -> Result<Option<Order>, RecordStoreError> {
            Ok(None)
        }
        fn insert(&self, _value: Order) -> Result<(), RecordStoreError> {
            Err(RecordStoreError::Unavailable("disk full".to_string()))
        }
        fn update(&self, _value: Order) -> Result<(), RecordStoreError> {
            Err(RecordStoreError::Unavailable("disk full".to_string()))
        }
        fn remove(&self, _key: &OrderId) -> Result<Order, RecordStoreError> {
            Err(RecordStoreError::NotFound)
        }
        fn list(&self) -> Result<Vec<Order>, RecordStoreError> {
            Ok(vec![])
        }
    }

    #[test]
    fn stock_is_restored_when_the_order_cannot_be_stored() {
        let fx = Fixture::new();
        let a = fx.beer(450, 20);
        let b = fx.beer(300, 8);
        let fulfillment = fx.fulfillment(BrokenOrders);

        let err = fulfillment
            .place(ClientId::new(), &[LineRequest::new(a, 5), LineRequest::new(b, 8)])
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Store(RecordStoreError::Unavailable(_))));
        assert_eq!(fx.ledger.read(a).unwrap().quantity(), 20);
        assert_eq!(fx.ledger.read(b).unwrap().quantity(), 8);
    }
}

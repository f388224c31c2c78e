//! Workflows that mutate stock through the ledger.
//!
//! Each workflow validates its request, lets the ledger apply the stock effect
//! atomically, then persists its own audit or order record. When that last step
//! fails the stock effect is compensated.

pub mod fulfillment;
pub mod losses;
pub mod restocking;

pub use fulfillment::{FulfillmentError, LineRequest, OrderFulfillment};
pub use losses::{LossError, LossRegistration, LossRequest};
pub use restocking::{RestockError, RestockRegistration};

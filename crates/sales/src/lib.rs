//! Sales Orders domain module.
//!
//! This crate contains business rules for customer orders, implemented purely
//! as deterministic domain logic (no IO, no storage). Stock checks and
//! decrements happen in the fulfillment workflow before an order is built.

pub mod order;

pub use order::{Order, OrderId, OrderLine, OrderStatus};

//! Catalog domain module: beers, categories and expiry rules.
//!
//! This crate contains business rules for the sellable catalog, implemented
//! purely as deterministic domain logic (no IO, no storage). Stock levels are
//! tracked separately by `brewery-inventory`, joined by [`BeerId`].

pub mod beer;
pub mod category;
pub mod expiry;

pub use beer::{Beer, BeerId};
pub use category::{Category, CategoryId};
pub use expiry::ExpiryPolicy;

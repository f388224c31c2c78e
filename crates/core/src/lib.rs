//! `brewery-core`: identifiers, errors and versioning shared by every domain crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ClientId, EntityId};
pub use version::ExpectedVersion;

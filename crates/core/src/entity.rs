//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Keyed record stores use this to derive the storage key from the record
/// itself, so a record can never be filed under another record's identifier.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

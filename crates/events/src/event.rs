use chrono::{DateTime, Utc};

/// A fact about committed state, published after the change it describes.
///
/// Consumers key their handling on `event_type()`; `version()` changes only
/// when the payload shape of that type changes.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, `<context>.<aggregate>.<what happened>`
    /// (e.g. "inventory.stock.decreased").
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// When the underlying change was committed.
    fn occurred_at(&self) -> DateTime<Utc>;
}

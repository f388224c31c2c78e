use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brewery_core::EntityId;

use crate::event::Event;

/// Envelope for an event, containing stream metadata.
///
/// This is the unit handed to the event bus.
///
/// Notes:
/// - `sequence_number` is the version of the record the event was produced
///   from, so consumers can drop duplicates and detect gaps per stream.
/// - `payload` is the typed domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    aggregate_id: EntityId,
    aggregate_type: String,

    /// Monotonically increasing position in the record's stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_id: EntityId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn aggregate_id(&self) -> EntityId {
        self.aggregate_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a freshly produced event with a new time-ordered event id.
    pub fn wrap(
        aggregate_id: EntityId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self::new(
            Uuid::now_v7(),
            aggregate_id,
            aggregate_type,
            sequence_number,
            payload,
        )
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

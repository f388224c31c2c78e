use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brewery_catalog::BeerId;
use brewery_core::{ClientId, DomainError, DomainResult, Entity, EntityId};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub EntityId);

impl OrderId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status lifecycle.
///
/// ```text
/// WaitingPayment → Paid → Shipped → Delivered
///        ↘         ↙
///         Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    WaitingPayment,
    Paid,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Stable storage code.
    pub fn code(self) -> i32 {
        match self {
            OrderStatus::WaitingPayment => 1,
            OrderStatus::Paid => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Canceled => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (WaitingPayment, Paid)
                | (Paid, Shipped)
                | (Shipped, Delivered)
                | (WaitingPayment, Canceled)
                | (Paid, Canceled)
        )
    }
}

impl TryFrom<i32> for OrderStatus {
    type Error = DomainError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(OrderStatus::WaitingPayment),
            2 => Ok(OrderStatus::Paid),
            3 => Ok(OrderStatus::Shipped),
            4 => Ok(OrderStatus::Delivered),
            5 => Ok(OrderStatus::Canceled),
            other => Err(DomainError::unknown_code("order status", other)),
        }
    }
}

/// Order line: beer, quantity, unit price captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub beer_id: BeerId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl OrderLine {
    /// `quantity * unit_price`, or `None` on overflow / non-positive quantity.
    pub fn subtotal(&self) -> Option<u64> {
        u64::try_from(self.quantity)
            .ok()?
            .checked_mul(self.unit_price)
    }
}

/// A placed customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    client_id: ClientId,
    moment: DateTime<Utc>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    total: u64,
}

impl Order {
    /// Build a new order in `WaitingPayment`.
    ///
    /// Stock must already have been committed for every line; this only
    /// validates the order's own shape and computes its total.
    pub fn place(
        id: OrderId,
        client_id: ClientId,
        lines: Vec<OrderLine>,
        moment: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one line"));
        }

        let mut total: u64 = 0;
        for line in &lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
            if line.unit_price == 0 {
                return Err(DomainError::validation("unit_price must be positive"));
            }
            total = line
                .subtotal()
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or_else(|| DomainError::invariant("order total overflows"))?;
        }

        Ok(Self {
            id,
            client_id,
            moment,
            status: OrderStatus::WaitingPayment,
            lines,
            total,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn moment(&self) -> DateTime<Utc> {
        self.moment
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Sum of `quantity * unit_price` over all lines.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn transition(&self, next: OrderStatus) -> DomainResult<Self> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "cannot move order from {:?} to {:?}",
                self.status, next
            )));
        }
        Ok(Self {
            status: next,
            ..self.clone()
        })
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

use crate::stock::StockStatus;

/// Maps an on-hand quantity to its status tier.
///
/// - `quantity <= 0` → [`StockStatus::OutOfStock`]
/// - `0 < quantity <= threshold` → [`StockStatus::Low`]
/// - `quantity > threshold` → [`StockStatus::Available`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatusClassifier {
    low_stock_threshold: u32,
}

impl StatusClassifier {
    pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

    pub fn new(low_stock_threshold: u32) -> Self {
        Self {
            low_stock_threshold,
        }
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn classify(&self, quantity: i64) -> StockStatus {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= i64::from(self.low_stock_threshold) {
            StockStatus::Low
        } else {
            StockStatus::Available
        }
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LOW_STOCK_THRESHOLD)
    }
}

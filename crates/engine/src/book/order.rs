use pit_core::{OrderId, Price, Side};

/// A resting limit order in the matching book.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: u64,
    pub filled: u64,
    /// Room clock milliseconds at placement, used for stale-order pruning.
    pub placed_at_ms: u64,
}

impl Order {
    pub fn new(id: OrderId, side: Side, price: Price, quantity: u64, placed_at_ms: u64) -> Self {
        Order {
            id,
            side,
            price,
            quantity,
            filled: 0,
            placed_at_ms,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.quantity - self.filled
    }

    pub fn is_filled(&self) -> bool {
        self.filled >= self.quantity
    }

    pub fn fill(&mut self, quantity: u64) {
        self.filled += quantity;
    }
}

/// A trade produced by the matching book.
///
/// The maker is the resting order, the taker is the aggressor; `taker_side`
/// gives the direction of the aggressor.
#[derive(Debug, Clone)]
pub struct Trade {
    pub price: Price,
    pub quantity: u64,
    pub maker_id: OrderId,
    pub taker_id: OrderId,
    pub taker_side: Side,
}

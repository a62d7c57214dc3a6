//! Random trader.
//!
//! Trades on a coin flip, half market orders and half limits near the
//! current price. Supplies the baseline volume every market needs and, on
//! average, pays the spread for the privilege.

use super::{BotAction, BotKind, MarketView, Strategy};
use pit_core::{GameRng, Side};

#[derive(Debug, Clone)]
pub struct RandomConfig {
    /// Buy when a uniform draw exceeds this.
    pub buy_above: f64,
    /// Sell when a uniform draw falls below this.
    pub sell_below: f64,
    /// Probability of using a market order instead of a limit.
    pub market_order_probability: f64,
    /// Maximum limit offset from the current price.
    pub max_offset_pct: f64,
    /// Shares per order.
    pub order_size: u64,
    /// Refuse to add orders once this many price levels are occupied on a
    /// side.
    pub max_levels_per_side: usize,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            buy_above: 0.9,
            sell_below: 0.1,
            market_order_probability: 0.5,
            max_offset_pct: 0.01,
            order_size: 10,
            max_levels_per_side: 10,
        }
    }
}

pub struct RandomBot {
    config: RandomConfig,
    rng: GameRng,
}

impl RandomBot {
    pub fn new(config: RandomConfig, rng: GameRng) -> Self {
        Self { config, rng }
    }

    fn order_for(&mut self, view: &MarketView<'_>, side: Side) -> Option<BotAction> {
        if view.own.level_count(side) > self.config.max_levels_per_side {
            return None;
        }
        let size = self.config.order_size;

        if self.rng.chance(self.config.market_order_probability) {
            return Some(BotAction::SubmitMarket {
                side,
                quantity: size,
            });
        }

        let offset = self.rng.bipolar() * self.config.max_offset_pct;
        let price = view.current_price.scaled_ceil(1.0 + offset);
        if view.own.has_order_at(side, price) {
            return None;
        }
        if side == Side::Buy && view.cash < price.notional(size) {
            return None;
        }
        Some(BotAction::SubmitLimit {
            side,
            price,
            quantity: size,
        })
    }
}

impl Strategy for RandomBot {
    fn kind(&self) -> BotKind {
        BotKind::Random
    }

    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction> {
        let roll = self.rng.uniform();

        if roll > self.config.buy_above {
            if let Some(action) = self.order_for(view, Side::Buy) {
                return vec![action];
            }
        } else if roll < self.config.sell_below && view.shares >= self.config.order_size {
            if let Some(action) = self.order_for(view, Side::Sell) {
                return vec![action];
            }
        }

        Vec::new()
    }
}

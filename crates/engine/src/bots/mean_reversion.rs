//! Mean-reversion trader.
//!
//! Compares the current price to its simple moving average over a longer
//! window and fades significant deviations: buys when the market trades
//! well below average, sells when well above.

use super::{BotAction, BotKind, MarketView, Strategy, price_band};
use pit_core::{GameRng, Price, Side};

#[derive(Debug, Clone)]
pub struct MeanReversionConfig {
    /// Averaging window in ticks.
    pub window: usize,
    /// Buy when `current < (1 - deviation) * avg`.
    pub deviation: f64,
    /// Probability gate: trade only when a uniform draw exceeds this.
    pub trade_gate: f64,
    /// Shares per order.
    pub order_size: u64,
    /// Limit offset around the guide price.
    pub offset_pct: f64,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            window: 20,
            deviation: 0.02,
            trade_gate: 0.5,
            order_size: 10,
            offset_pct: 0.005,
        }
    }
}

pub struct MeanReversionBot {
    config: MeanReversionConfig,
    rng: GameRng,
}

impl MeanReversionBot {
    pub fn new(config: MeanReversionConfig, rng: GameRng) -> Self {
        Self { config, rng }
    }

    fn average(&self, history: &[pit_core::Price]) -> Option<f64> {
        if history.len() < self.config.window {
            return None;
        }
        let tail = &history[history.len() - self.config.window..];
        Some(tail.iter().map(|p| p.as_f64()).sum::<f64>() / tail.len() as f64)
    }
}

impl Strategy for MeanReversionBot {
    fn kind(&self) -> BotKind {
        BotKind::MeanReversion
    }

    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction> {
        let Some(avg) = self.average(view.history) else {
            return Vec::new();
        };

        let current = view.current_price.as_f64();
        let size = self.config.order_size;
        let (above, below) = price_band(
            view.guide_price,
            Price::MIN_TICK,
            self.config.offset_pct,
            self.config.offset_pct,
        );

        if current < (1.0 - self.config.deviation) * avg
            && self.rng.uniform() > self.config.trade_gate
        {
            if !view.own.has_order_at(Side::Buy, below) && view.cash >= below.notional(size) {
                return vec![BotAction::SubmitLimit {
                    side: Side::Buy,
                    price: below,
                    quantity: size,
                }];
            }
        } else if current > (1.0 + self.config.deviation) * avg
            && view.shares >= size
            && self.rng.uniform() > self.config.trade_gate
            && !view.own.has_order_at(Side::Sell, above)
        {
            return vec![BotAction::SubmitLimit {
                side: Side::Sell,
                price: above,
                quantity: size,
            }];
        }

        Vec::new()
    }
}

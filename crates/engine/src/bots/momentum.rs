//! Momentum trader.
//!
//! Tracks the guide-price change over a short lookback window. A move past
//! the threshold triggers a limit order just beyond the guide in the
//! direction of the trend. Stale quotes are pruned after a few seconds so
//! the bot never chases a reversed trend with old intent.

use super::{BotAction, BotKind, MarketView, Strategy, price_band};
use pit_core::{GameRng, Price, Side};

#[derive(Debug, Clone)]
pub struct MomentumConfig {
    /// Lookback window in ticks.
    pub lookback: usize,
    /// Minimum fractional move to trigger a trade.
    pub threshold: f64,
    /// Probability gate: trade only when a uniform draw exceeds this.
    pub trade_gate: f64,
    /// Shares per order.
    pub order_size: u64,
    /// Limit offset around the guide price.
    pub offset_pct: f64,
    /// Cancel own orders older than this.
    pub stale_after_ms: u64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            lookback: 5,
            threshold: 0.01,
            trade_gate: 0.7,
            order_size: 10,
            offset_pct: 0.01,
            stale_after_ms: 5_000,
        }
    }
}

pub struct MomentumBot {
    config: MomentumConfig,
    rng: GameRng,
}

impl MomentumBot {
    pub fn new(config: MomentumConfig, rng: GameRng) -> Self {
        Self { config, rng }
    }

    fn signal(&self, history: &[Price]) -> Option<f64> {
        if history.len() <= self.config.lookback {
            return None;
        }
        let current = history.last()?.as_f64();
        let old = history[history.len() - 1 - self.config.lookback].as_f64();
        if old <= 0.0 {
            return None;
        }
        Some((current - old) / old)
    }
}

impl Strategy for MomentumBot {
    fn kind(&self) -> BotKind {
        BotKind::Momentum
    }

    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction> {
        let mut actions = Vec::new();

        let cutoff = view.now_ms.saturating_sub(self.config.stale_after_ms);
        if view.now_ms >= self.config.stale_after_ms {
            for side in [Side::Buy, Side::Sell] {
                for id in view.own.stale_orders(side, cutoff) {
                    actions.push(BotAction::Cancel(id));
                }
            }
        }

        let Some(momentum) = self.signal(view.history) else {
            return actions;
        };

        let size = self.config.order_size;
        let (chase, fade) = price_band(
            view.guide_price,
            Price::MIN_TICK,
            self.config.offset_pct,
            self.config.offset_pct,
        );

        if momentum > self.config.threshold && self.rng.uniform() > self.config.trade_gate {
            if !view.own.has_order_at(Side::Buy, chase) && view.cash >= chase.notional(size) {
                actions.push(BotAction::SubmitLimit {
                    side: Side::Buy,
                    price: chase,
                    quantity: size,
                });
            }
        } else if momentum < -self.config.threshold
            && view.shares >= size
            && self.rng.uniform() > self.config.trade_gate
            && !view.own.has_order_at(Side::Sell, fade)
        {
            actions.push(BotAction::SubmitLimit {
                side: Side::Sell,
                price: fade,
                quantity: size,
            });
        }

        actions
    }
}

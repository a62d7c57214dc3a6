//! Liquidity provider (market maker).
//!
//! Quotes both sides around the current price. The spread widens with
//! realised volatility, quotes are skewed against accumulated inventory,
//! and a position drifting past the deviation limit triggers an aggressive
//! market-order rebalance instead of passive quoting.

use super::{BotAction, BotKind, MarketView, Strategy};
use pit_core::{Price, Side};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct LiquidityConfig {
    /// Base half-spread as a fraction of mid: quotes sit at
    /// `current * (1 +/- effective_spread / 2)` before skew.
    pub base_spread: f64,
    /// Ceiling on the effective spread.
    pub max_spread: f64,
    /// Rolling window for realised volatility, in ticks.
    pub vol_window: usize,
    /// Inventory the bot tries to hold.
    pub target_inventory: u64,
    /// Absolute deviation from target that triggers a market rebalance.
    pub max_deviation: u64,
    /// Quote shift per share of inventory deviation, as a price fraction.
    pub skew_factor: f64,
    /// Shares per quote.
    pub order_size: u64,
    /// Requote when the market has moved this fraction from the last quote.
    pub requote_threshold: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            base_spread: 0.01,
            max_spread: 0.05,
            vol_window: 20,
            target_inventory: 50,
            max_deviation: 40,
            skew_factor: 0.0002,
            order_size: 10,
            requote_threshold: 0.002,
        }
    }
}

pub struct LiquidityBot {
    config: LiquidityConfig,
    returns: VecDeque<f64>,
    last_price: Option<Price>,
    last_bid: Option<Price>,
    last_ask: Option<Price>,
}

impl LiquidityBot {
    pub fn new(config: LiquidityConfig) -> Self {
        Self {
            returns: VecDeque::with_capacity(config.vol_window + 1),
            config,
            last_price: None,
            last_bid: None,
            last_ask: None,
        }
    }

    fn track_return(&mut self, price: Price) {
        if let Some(last) = self.last_price {
            let last = last.as_f64();
            if last > 0.0 {
                self.returns.push_back((price.as_f64() - last) / last);
                if self.returns.len() > self.config.vol_window {
                    self.returns.pop_front();
                }
            }
        }
        self.last_price = Some(price);
    }

    /// Standard deviation of tracked returns.
    fn volatility(&self) -> f64 {
        let n = self.returns.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.returns.iter().sum::<f64>() / n as f64;
        let var = self.returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
        var.sqrt()
    }

    fn effective_spread(&self) -> f64 {
        (self.config.base_spread * (1.0 + self.volatility() * 100.0)).min(self.config.max_spread)
    }

    fn should_requote(&self, bid: Price, ask: Price) -> bool {
        let (Some(last_bid), Some(last_ask)) = (self.last_bid, self.last_ask) else {
            return true;
        };
        let moved = |new: Price, old: Price| {
            let old_f = old.as_f64();
            old_f > 0.0 && ((new.as_f64() - old_f).abs() / old_f) > self.config.requote_threshold
        };
        moved(bid, last_bid) || moved(ask, last_ask)
    }
}

impl Strategy for LiquidityBot {
    fn kind(&self) -> BotKind {
        BotKind::Liquidity
    }

    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction> {
        self.track_return(view.current_price);

        let inventory = view.shares as i64;
        let deviation = inventory - self.config.target_inventory as i64;

        // Inventory out of bounds: pull quotes and rebalance at market.
        if deviation.unsigned_abs() > self.config.max_deviation {
            let mut actions: Vec<BotAction> = view
                .own
                .orders(Side::Buy)
                .chain(view.own.orders(Side::Sell))
                .map(|o| BotAction::Cancel(o.id.clone()))
                .collect();
            let quantity = deviation.unsigned_abs().min(self.config.order_size * 2);
            if deviation > 0 {
                actions.push(BotAction::SubmitMarket {
                    side: Side::Sell,
                    quantity,
                });
            } else if view.snapshot.best_ask().is_some() {
                actions.push(BotAction::SubmitMarket {
                    side: Side::Buy,
                    quantity,
                });
            }
            return actions;
        }

        let half = self.effective_spread() / 2.0;
        let skew = -(deviation as f64) * self.config.skew_factor;
        let current = view.current_price.as_f64();
        let bid = Price::from_f64_ceil(current * (1.0 - half + skew));
        let ask = Price::from_f64_ceil(current * (1.0 + half + skew));
        if bid >= ask || bid < Price::MIN_TICK {
            return Vec::new();
        }

        if !self.should_requote(bid, ask) {
            return Vec::new();
        }

        // Replace the old quotes with the new pair.
        let mut actions: Vec<BotAction> = view
            .own
            .orders_with_price(Side::Buy)
            .filter(|(p, _)| *p != bid)
            .map(|(_, o)| BotAction::Cancel(o.id.clone()))
            .chain(
                view.own
                    .orders_with_price(Side::Sell)
                    .filter(|(p, _)| *p != ask)
                    .map(|(_, o)| BotAction::Cancel(o.id.clone())),
            )
            .collect();

        let size = self.config.order_size;
        if !view.own.has_order_at(Side::Buy, bid) && view.cash >= bid.notional(size) {
            actions.push(BotAction::SubmitLimit {
                side: Side::Buy,
                price: bid,
                quantity: size,
            });
        }
        if !view.own.has_order_at(Side::Sell, ask) && view.shares >= size {
            actions.push(BotAction::SubmitLimit {
                side: Side::Sell,
                price: ask,
                quantity: size,
            });
        }

        self.last_bid = Some(bid);
        self.last_ask = Some(ask);
        actions
    }
}

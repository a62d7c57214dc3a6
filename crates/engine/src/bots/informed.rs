//! Informed trader.
//!
//! Knows the intrinsic value exactly. Buys aggressively with market orders
//! when the market trades well below intrinsic, exits through a resting
//! limit sell marked up over intrinsic, and dumps with a market sell when
//! the market overshoots far above. Sell orders still positioned at or
//! beyond the exit markup are left alone; only quotes the intrinsic has
//! moved away from get cancelled.

use super::{BotAction, BotKind, MarketView, Strategy};
use pit_core::{Price, Side};

#[derive(Debug, Clone)]
pub struct InformedConfig {
    /// Buy when `current < underprice * intrinsic`.
    pub underprice: f64,
    /// Market-sell when `current > overprice * intrinsic`.
    pub overprice: f64,
    /// Exit limit sells are placed at `exit_markup * intrinsic`.
    pub exit_markup: f64,
    /// Shares per order.
    pub order_size: u64,
}

impl Default for InformedConfig {
    fn default() -> Self {
        Self {
            underprice: 0.95,
            overprice: 1.10,
            exit_markup: 1.05,
            order_size: 10,
        }
    }
}

pub struct InformedBot {
    config: InformedConfig,
}

impl InformedBot {
    pub fn new(config: InformedConfig) -> Self {
        Self { config }
    }
}

impl Strategy for InformedBot {
    fn kind(&self) -> BotKind {
        BotKind::Informed
    }

    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction> {
        let mut actions = Vec::new();
        let intrinsic = view.intrinsic_value.as_f64();
        let current = view.current_price.as_f64();
        let exit_price = Price::from_f64_ceil(self.config.exit_markup * intrinsic);

        // Prune sells the intrinsic has moved above: they would now exit
        // below the markup. Correctly positioned ones stay.
        for (price, order) in view.own.orders_with_price(Side::Sell) {
            if price < exit_price {
                actions.push(BotAction::Cancel(order.id.clone()));
            }
        }

        let size = self.config.order_size;

        if current < self.config.underprice * intrinsic {
            // Market buy the mispricing; the exit sell is parked once the
            // shares arrive.
            if let Some(ask) = view.snapshot.best_ask() {
                if view.cash >= ask.notional(size) {
                    actions.push(BotAction::SubmitMarket {
                        side: Side::Buy,
                        quantity: size,
                    });
                }
            }
        } else if current > self.config.overprice * intrinsic && view.shares > 0 {
            actions.push(BotAction::SubmitMarket {
                side: Side::Sell,
                quantity: view.shares.min(size),
            });
        } else if view.shares > 0 && !view.own.has_order_at(Side::Sell, exit_price) {
            actions.push(BotAction::SubmitLimit {
                side: Side::Sell,
                price: exit_price,
                quantity: view.shares,
            });
        }

        actions
    }
}

//! Spread trader.
//!
//! Watches the touch. When the spread is wide relative to the price it
//! posts a pair of limits 30% inside each edge, collecting the gap if both
//! fill. Its own orders are refreshed on an interval so quotes follow the
//! market.

use super::{BotAction, BotKind, MarketView, Strategy};
use pit_core::{Price, Side};

#[derive(Debug, Clone)]
pub struct SpreadConfig {
    /// Only quote when `spread / current` exceeds this.
    pub min_spread_pct: f64,
    /// How far into the spread to post, from each edge.
    pub inside_fraction: f64,
    /// Shares per order.
    pub order_size: u64,
    /// Refresh own orders older than this.
    pub refresh_ms: u64,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            min_spread_pct: 0.02,
            inside_fraction: 0.3,
            order_size: 10,
            refresh_ms: 3_000,
        }
    }
}

pub struct SpreadBot {
    config: SpreadConfig,
}

impl SpreadBot {
    pub fn new(config: SpreadConfig) -> Self {
        Self { config }
    }
}

impl Strategy for SpreadBot {
    fn kind(&self) -> BotKind {
        BotKind::Spread
    }

    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction> {
        let mut actions = Vec::new();

        // Refresh: drop quotes that have sat too long.
        if view.now_ms >= self.config.refresh_ms {
            let cutoff = view.now_ms - self.config.refresh_ms;
            for side in [Side::Buy, Side::Sell] {
                for id in view.own.stale_orders(side, cutoff) {
                    actions.push(BotAction::Cancel(id));
                }
            }
        }

        let (Some(bid), Some(ask)) = (view.snapshot.best_bid(), view.snapshot.best_ask()) else {
            return actions;
        };
        let current = view.current_price.as_f64();
        if current <= 0.0 || ask <= bid {
            return actions;
        }

        let spread = (ask - bid).as_f64();
        if spread / current <= self.config.min_spread_pct {
            return actions;
        }

        let step = spread * self.config.inside_fraction;
        let buy_price = Price::from_f64_ceil(bid.as_f64() + step);
        let sell_price = Price::from_f64_ceil(ask.as_f64() - step);
        if buy_price >= sell_price {
            return actions;
        }

        let size = self.config.order_size;
        if !view.own.has_order_at(Side::Buy, buy_price) && view.cash >= buy_price.notional(size) {
            actions.push(BotAction::SubmitLimit {
                side: Side::Buy,
                price: buy_price,
                quantity: size,
            });
        }
        if !view.own.has_order_at(Side::Sell, sell_price) && view.shares >= size {
            actions.push(BotAction::SubmitLimit {
                side: Side::Sell,
                price: sell_price,
                quantity: size,
            });
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::ClientOrder;
    use crate::bots::testkit::ViewFixture;
    use pit_core::{OrderId, ParticipantId};

    fn wide_fixture() -> ViewFixture {
        let mut fixture = ViewFixture::at_price(1000);
        // 9.50 / 10.50: a 10% spread.
        fixture.snapshot.bids = vec![(Price::from_cents(950), 100)];
        fixture.snapshot.asks = vec![(Price::from_cents(1050), 100)];
        fixture
    }

    #[test]
    fn test_posts_inside_wide_spread() {
        let fixture = wide_fixture();
        let mut bot = SpreadBot::new(SpreadConfig::default());
        let actions = bot.decide(&fixture.view());

        let mut buy = None;
        let mut sell = None;
        for a in &actions {
            if let BotAction::SubmitLimit { side, price, .. } = a {
                match side {
                    Side::Buy => buy = Some(*price),
                    Side::Sell => sell = Some(*price),
                }
            }
        }
        // 30% of the 1.00 spread from each edge.
        assert_eq!(buy.unwrap(), Price::from_cents(980));
        assert_eq!(sell.unwrap(), Price::from_cents(1020));
    }

    #[test]
    fn test_quiet_on_tight_spread() {
        let fixture = ViewFixture::at_price(1000); // 0.10 spread on 10.00
        let mut bot = SpreadBot::new(SpreadConfig::default());
        assert!(bot.decide(&fixture.view()).is_empty());
    }

    #[test]
    fn test_does_not_duplicate_quotes() {
        let mut fixture = wide_fixture();
        fixture.own.add(
            Side::Buy,
            Price::from_cents(980),
            ClientOrder {
                id: OrderId::new(&ParticipantId::new("sprd"), 1),
                quantity: 10,
                placed_at_ms: 0,
            },
        );
        fixture.own.add(
            Side::Sell,
            Price::from_cents(1020),
            ClientOrder {
                id: OrderId::new(&ParticipantId::new("sprd"), 2),
                quantity: 10,
                placed_at_ms: 0,
            },
        );

        let mut bot = SpreadBot::new(SpreadConfig::default());
        assert!(bot.decide(&fixture.view()).is_empty());
    }

    #[test]
    fn test_refreshes_old_orders() {
        let mut fixture = wide_fixture();
        fixture.now_ms = 10_000;
        fixture.own.add(
            Side::Buy,
            Price::from_cents(960),
            ClientOrder {
                id: OrderId::new(&ParticipantId::new("sprd"), 1),
                quantity: 10,
                placed_at_ms: 2_000,
            },
        );

        let mut bot = SpreadBot::new(SpreadConfig::default());
        let actions = bot.decide(&fixture.view());
        assert!(
            actions
                .iter()
                .any(|a| matches!(a, BotAction::Cancel(id) if id.as_str() == "sprd#1"))
        );
    }
}

//! Partially-informed trader.
//!
//! Holds a noisy private estimate of the intrinsic value, redrawn whenever
//! the true intrinsic moves. Buys deep discounts against the true intrinsic
//! and exits against its own estimate, which keeps its two thresholds from
//! ever agreeing perfectly with the informed flow.

use super::{BotAction, BotKind, MarketView, Strategy};
use pit_core::{GameRng, Price, Side};

#[derive(Debug, Clone)]
pub struct PartiallyInformedConfig {
    /// Buy when `current < underprice * intrinsic`.
    pub underprice: f64,
    /// Sell when `current > overprice * estimate`.
    pub overprice: f64,
    /// Half-width of the estimate noise, as a fraction of intrinsic.
    pub noise: f64,
    /// Shares per order.
    pub order_size: u64,
}

impl Default for PartiallyInformedConfig {
    fn default() -> Self {
        Self {
            underprice: 0.96,
            overprice: 1.08,
            noise: 0.1,
            order_size: 10,
        }
    }
}

pub struct PartiallyInformedBot {
    config: PartiallyInformedConfig,
    rng: GameRng,
    last_intrinsic: Option<Price>,
    estimate: f64,
}

impl PartiallyInformedBot {
    pub fn new(config: PartiallyInformedConfig, rng: GameRng) -> Self {
        Self {
            config,
            rng,
            last_intrinsic: None,
            estimate: 0.0,
        }
    }

    /// Redraw the noisy estimate when the fundamental has moved.
    fn refresh_estimate(&mut self, intrinsic: Price) {
        if self.last_intrinsic != Some(intrinsic) {
            let noise = self.rng.bipolar() * self.config.noise;
            self.estimate = intrinsic.as_f64() * (1.0 + noise);
            self.last_intrinsic = Some(intrinsic);
        }
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }
}

impl Strategy for PartiallyInformedBot {
    fn kind(&self) -> BotKind {
        BotKind::PartiallyInformed
    }

    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction> {
        self.refresh_estimate(view.intrinsic_value);

        let current = view.current_price.as_f64();
        let size = self.config.order_size;

        if current < self.config.underprice * view.intrinsic_value.as_f64() {
            // Cross the book when there is something to cross, otherwise
            // leave a limit at the guide.
            match view.snapshot.best_ask() {
                Some(ask) if view.cash >= ask.notional(size) => {
                    return vec![BotAction::SubmitMarket {
                        side: Side::Buy,
                        quantity: size,
                    }];
                }
                Some(_) => {}
                None => {
                    let price = view.guide_price;
                    if !view.own.has_order_at(Side::Buy, price) && view.cash >= price.notional(size)
                    {
                        return vec![BotAction::SubmitLimit {
                            side: Side::Buy,
                            price,
                            quantity: size,
                        }];
                    }
                }
            }
        } else if current > self.config.overprice * self.estimate && view.shares > 0 {
            let quantity = view.shares.min(size);
            if view.snapshot.best_bid().is_some() {
                return vec![BotAction::SubmitMarket {
                    side: Side::Sell,
                    quantity,
                }];
            } else {
                let price = view.guide_price;
                if !view.own.has_order_at(Side::Sell, price) {
                    return vec![BotAction::SubmitLimit {
                        side: Side::Sell,
                        price,
                        quantity,
                    }];
                }
            }
        }

        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::testkit::ViewFixture;

    fn bot(seed: u64) -> PartiallyInformedBot {
        PartiallyInformedBot::new(PartiallyInformedConfig::default(), GameRng::new(seed))
    }

    #[test]
    fn test_estimate_refreshes_only_on_intrinsic_change() {
        let mut fixture = ViewFixture::at_price(1000);
        fixture.intrinsic = Price::from_int(10);
        let mut b = bot(42);

        b.decide(&fixture.view());
        let first = b.estimate();
        b.decide(&fixture.view());
        assert_eq!(b.estimate(), first);

        fixture.intrinsic = Price::from_int(12);
        b.decide(&fixture.view());
        assert_ne!(b.estimate(), first);
    }

    #[test]
    fn test_estimate_within_noise_band() {
        let mut fixture = ViewFixture::at_price(1000);
        fixture.intrinsic = Price::from_int(10);
        for seed in 0..50 {
            let mut b = bot(seed);
            b.decide(&fixture.view());
            let est = b.estimate();
            assert!((9.0..11.0).contains(&est), "estimate {est} out of band");
        }
    }

    #[test]
    fn test_market_buys_when_asks_present() {
        let mut fixture = ViewFixture::at_price(1000);
        fixture.intrinsic = Price::from_cents(1200);
        fixture.shares = 0;

        let mut b = bot(42);
        let actions = b.decide(&fixture.view());
        assert!(matches!(
            actions.as_slice(),
            [BotAction::SubmitMarket {
                side: Side::Buy,
                ..
            }]
        ));
    }

    #[test]
    fn test_limit_buy_when_ask_side_empty() {
        let mut fixture = ViewFixture::at_price(1000);
        fixture.intrinsic = Price::from_cents(1200);
        fixture.snapshot.asks.clear();

        let mut b = bot(42);
        let actions = b.decide(&fixture.view());
        assert!(matches!(
            actions.as_slice(),
            [BotAction::SubmitLimit {
                side: Side::Buy,
                ..
            }]
        ));
    }

    #[test]
    fn test_sells_far_above_estimate() {
        let mut fixture = ViewFixture::at_price(1300);
        fixture.intrinsic = Price::from_int(10);
        fixture.shares = 20;

        // 13.00 > 1.08 * estimate for any estimate in the +/-10% band.
        let mut b = bot(42);
        let actions = b.decide(&fixture.view());
        assert!(matches!(
            actions.as_slice(),
            [BotAction::SubmitMarket {
                side: Side::Sell,
                ..
            }]
        ));
    }
}

//! Trading bot framework.
//!
//! # Strategies
//!
//! All bots are profit-seeking participants polled once per market tick.
//! Market character emerges from their mix:
//!
//! - **Momentum**: bets on trend continuation, amplifies moves
//! - **MeanReversion**: bets on overreaction correction, dampens volatility
//! - **Informed**: trades on the intrinsic value (toxic flow)
//! - **PartiallyInformed**: trades on a noisy intrinsic estimate
//! - **Liquidity**: two-sided quoting with inventory skew
//! - **Random**: baseline volume, loses to the spread on average
//! - **Spread**: posts inside wide spreads to tighten them
//!
//! A strategy returns the actions it wants executed this tick; an empty list
//! means "no new intent". Strategies are expected to be idempotent with
//! respect to orders they already have open: if the target price is already
//! quoted, they return nothing rather than stacking duplicates.

mod informed;
mod liquidity;
mod mean_reversion;
mod momentum;
mod partially_informed;
mod random;
mod spread;

pub use informed::{InformedBot, InformedConfig};
pub use liquidity::{LiquidityBot, LiquidityConfig};
pub use mean_reversion::{MeanReversionBot, MeanReversionConfig};
pub use momentum::{MomentumBot, MomentumConfig};
pub use partially_informed::{PartiallyInformedBot, PartiallyInformedConfig};
pub use random::{RandomBot, RandomConfig};
pub use spread::{SpreadBot, SpreadConfig};

use crate::book::{BookSnapshot, ClientBook};
use pit_core::{Cash, GameRng, OrderId, Price, Side};
use serde::Serialize;

/// An action a bot wants executed against the book.
#[derive(Debug, Clone)]
pub enum BotAction {
    SubmitLimit {
        side: Side,
        price: Price,
        quantity: u64,
    },
    SubmitMarket {
        side: Side,
        quantity: u64,
    },
    Cancel(OrderId),
}

/// Market state handed to a bot each tick.
///
/// `current_price` is the last traded price (the guide price until the first
/// trade); `history` is the bounded guide-price series. The bot's own
/// balances and open orders ride along so strategies can check affordability
/// and dedupe intent without reaching back into the engine.
#[derive(Debug)]
pub struct MarketView<'a> {
    pub tick: u64,
    pub now_ms: u64,
    pub current_price: Price,
    pub guide_price: Price,
    pub intrinsic_value: Price,
    pub history: &'a [Price],
    pub snapshot: &'a BookSnapshot,
    pub own: &'a ClientBook,
    pub cash: Cash,
    pub shares: u64,
}

/// Decision contract implemented by every strategy.
pub trait Strategy: Send {
    fn kind(&self) -> BotKind;

    /// Inspect the market and return the orders to submit or cancel.
    fn decide(&mut self, view: &MarketView<'_>) -> Vec<BotAction>;
}

/// The catalogue of bot strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BotKind {
    Momentum,
    MeanReversion,
    Informed,
    PartiallyInformed,
    Liquidity,
    Random,
    Spread,
}

impl BotKind {
    pub const ALL: [BotKind; 7] = [
        BotKind::Momentum,
        BotKind::MeanReversion,
        BotKind::Informed,
        BotKind::PartiallyInformed,
        BotKind::Liquidity,
        BotKind::Random,
        BotKind::Spread,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BotKind::Momentum => "momentum",
            BotKind::MeanReversion => "mean-reversion",
            BotKind::Informed => "informed",
            BotKind::PartiallyInformed => "partially-informed",
            BotKind::Liquidity => "liquidity",
            BotKind::Random => "random",
            BotKind::Spread => "spread",
        }
    }

    pub fn from_str(s: &str) -> Option<BotKind> {
        BotKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Instantiate the strategy with its default configuration and a
    /// dedicated generator.
    pub fn build(&self, rng: GameRng) -> Box<dyn Strategy> {
        match self {
            BotKind::Momentum => Box::new(MomentumBot::new(MomentumConfig::default(), rng)),
            BotKind::MeanReversion => {
                Box::new(MeanReversionBot::new(MeanReversionConfig::default(), rng))
            }
            BotKind::Informed => Box::new(InformedBot::new(InformedConfig::default())),
            BotKind::PartiallyInformed => Box::new(PartiallyInformedBot::new(
                PartiallyInformedConfig::default(),
                rng,
            )),
            BotKind::Liquidity => Box::new(LiquidityBot::new(LiquidityConfig::default())),
            BotKind::Random => Box::new(RandomBot::new(RandomConfig::default(), rng)),
            BotKind::Spread => Box::new(SpreadBot::new(SpreadConfig::default())),
        }
    }
}

/// Static descriptor served by the bot catalogue endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BotDescriptor {
    pub kind: BotKind,
    pub title: &'static str,
    pub description: &'static str,
}

pub fn bot_catalogue() -> Vec<BotDescriptor> {
    vec![
        BotDescriptor {
            kind: BotKind::Momentum,
            title: "Momentum trader",
            description: "Chases recent price moves and rides the trend.",
        },
        BotDescriptor {
            kind: BotKind::MeanReversion,
            title: "Mean reverter",
            description: "Fades prices far from their recent average.",
        },
        BotDescriptor {
            kind: BotKind::Informed,
            title: "Informed trader",
            description: "Knows the fundamental value and trades mispricings.",
        },
        BotDescriptor {
            kind: BotKind::PartiallyInformed,
            title: "Tipped-off trader",
            description: "Trades on a noisy estimate of the fundamental.",
        },
        BotDescriptor {
            kind: BotKind::Liquidity,
            title: "Market maker",
            description: "Quotes both sides and manages its inventory.",
        },
        BotDescriptor {
            kind: BotKind::Random,
            title: "Retail flow",
            description: "Trades on a whim, providing baseline volume.",
        },
        BotDescriptor {
            kind: BotKind::Spread,
            title: "Spread trader",
            description: "Posts inside wide spreads to capture the gap.",
        },
    ]
}

/// Prices one step up and one step down from `base`, guaranteeing at least
/// `min_step` of separation in both directions.
pub fn price_band(base: Price, min_step: Price, up_pct: f64, down_pct: f64) -> (Price, Price) {
    let up = base.scaled_ceil(1.0 + up_pct).max(base + min_step);
    let down = base
        .scaled_ceil(1.0 - down_pct)
        .min(Price::from_cents(base.cents() - min_step.cents()))
        .max(Price::MIN_TICK);
    (up, down)
}

#[cfg(test)]
pub(crate) mod testkit {
    use super::*;

    /// Owned market-state fixture for strategy tests; [`ViewFixture::view`]
    /// borrows it as the `MarketView` a bot would see.
    pub struct ViewFixture {
        pub snapshot: BookSnapshot,
        pub own: ClientBook,
        pub history: Vec<Price>,
        pub current: Price,
        pub guide: Price,
        pub intrinsic: Price,
        pub cash: Cash,
        pub shares: u64,
        pub tick: u64,
        pub now_ms: u64,
    }

    impl ViewFixture {
        pub fn at_price(cents: i64) -> Self {
            let price = Price::from_cents(cents);
            Self {
                snapshot: BookSnapshot {
                    bids: vec![(Price::from_cents(cents - 5), 100)],
                    asks: vec![(Price::from_cents(cents + 5), 100)],
                },
                own: ClientBook::default(),
                history: Vec::new(),
                current: price,
                guide: price,
                intrinsic: price,
                cash: Cash::from_int(100_000),
                shares: 100,
                tick: 0,
                now_ms: 0,
            }
        }

        /// Fill the history with a linear walk ending at the current price.
        pub fn with_trend(mut self, start_cents: i64, samples: usize) -> Self {
            let end = self.current.cents();
            self.history = (0..samples)
                .map(|i| {
                    let frac = i as f64 / (samples.max(2) - 1) as f64;
                    Price::from_cents(
                        start_cents + ((end - start_cents) as f64 * frac).round() as i64,
                    )
                })
                .collect();
            self
        }

        pub fn with_flat_history(mut self, samples: usize) -> Self {
            self.history = vec![self.current; samples];
            self
        }

        pub fn view(&self) -> MarketView<'_> {
            MarketView {
                tick: self.tick,
                now_ms: self.now_ms,
                current_price: self.current,
                guide_price: self.guide,
                intrinsic_value: self.intrinsic,
                history: &self.history,
                snapshot: &self.snapshot,
                own: &self.own,
                cash: self.cash,
                shares: self.shares,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_string_roundtrip() {
        for kind in BotKind::ALL {
            assert_eq!(BotKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(BotKind::from_str("hft-shark"), None);
    }

    #[test]
    fn test_catalogue_covers_all_kinds() {
        let catalogue = bot_catalogue();
        assert_eq!(catalogue.len(), BotKind::ALL.len());
        for kind in BotKind::ALL {
            assert!(catalogue.iter().any(|d| d.kind == kind));
        }
    }

    #[test]
    fn test_price_band_enforces_min_step() {
        // 1% of 1.00 rounds to a single cent either way.
        let (up, down) = price_band(Price::from_int(1), Price::MIN_TICK, 0.001, 0.001);
        assert_eq!(up, Price::from_cents(101));
        assert_eq!(down, Price::from_cents(99));

        let (up, down) = price_band(Price::from_int(100), Price::MIN_TICK, 0.01, 0.01);
        assert_eq!(up, Price::from_int(101));
        assert_eq!(down, Price::from_int(99));
    }

    #[test]
    fn test_price_band_floors_at_tick() {
        let (_, down) = price_band(Price::MIN_TICK, Price::MIN_TICK, 0.5, 0.5);
        assert_eq!(down, Price::MIN_TICK);
    }
}

//! The per-room simulator.
//!
//! Owns the price generator, the order book wrapper, every participant's
//! accounting, and the bot population. The room task drives it through two
//! entry points: [`Simulator::clock_tick`] once per game second and
//! [`Simulator::market_tick`] once per 200 ms market tick. Both are
//! synchronous and deterministic; all timing lives with the caller.
//!
//! Ordering guarantees: the tick's `(intrinsic, guide)` pair is computed
//! before any bot is polled; bots run in stable order; each bot's orders are
//! matched and their fills settled before the next bot looks at the market;
//! the market price is emitted at most once per tick and only when it
//! changed.

use crate::book::{BookSnapshot, FillReport, OrderBookWrapper};
use crate::bots::{BotAction, BotKind, MarketView, Strategy};
use crate::generator::PriceGenerator;
use crate::news::NewsEffect;
use crate::participant::{Participant, Portfolio};
use pit_core::{Cash, GameRng, GameSettings, OrderId, ParticipantId, Price, Side};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Market tick interval driven by the room task.
pub const TICK_INTERVAL_MS: u64 = 200;

/// Clock tick interval driven by the room task.
pub const CLOCK_INTERVAL_MS: u64 = 1_000;

/// Shares every spawned bot starts with, so sellers exist from tick one.
const BOT_STARTING_SHARES: u64 = 100;

/// Fractional step applied on each scheduled intrinsic drift.
const INTRINSIC_DRIFT_PCT: f64 = 0.05;

/// Minimum spacing of scheduled intrinsic drifts, and the margin kept clear
/// before the end of the game, in seconds.
const DRIFT_SPACING_SECS: u64 = 8;

/// Target number of intrinsic drifts per game.
const DRIFT_SEGMENTS: u64 = 10;

/// Observable output of a simulator step.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// One game second elapsed.
    Clock {
        elapsed_secs: u64,
        time_left_secs: u64,
    },
    /// Intrinsic and guide prices for debug overlays.
    DebugPrices { intrinsic: Price, guide: Price },
    /// The market price changed this tick.
    Price(Price),
    /// A participant's balances changed.
    Portfolio(ParticipantId),
    /// The game duration elapsed.
    Ended,
}

/// An order submission, shared by bots and human clients.
#[derive(Debug, Clone)]
pub enum OrderRequest {
    Limit {
        side: Side,
        price: Price,
        quantity: u64,
    },
    Market {
        side: Side,
        quantity: u64,
    },
}

/// A spawned trading bot: its participant id plus the strategy driving it.
pub struct Bot {
    pub id: ParticipantId,
    pub kind: BotKind,
    strategy: Box<dyn Strategy>,
}

pub struct Simulator {
    settings: GameSettings,
    generator: PriceGenerator,
    wrapper: OrderBookWrapper,
    participants: HashMap<ParticipantId, Participant>,
    bots: Vec<Bot>,
    market_price: Price,
    last_emitted_price: Price,
    tick_count: u64,
    elapsed_secs: u64,
    drift_times: Vec<u64>,
    next_drift: usize,
    next_order_seq: u64,
    ended: bool,
}

impl Simulator {
    /// Build a simulator from room settings. The seed fans out through
    /// forked generators in a fixed order (price model, news, powers, then
    /// one per bot), so the price path does not depend on the bot count.
    pub fn new(settings: GameSettings) -> Self {
        let mut rng = GameRng::new(settings.seed);
        let generator_rng = rng.fork();
        let generator = PriceGenerator::new(settings.opening_price, settings.market_volatility, generator_rng);

        let mut sim = Self {
            market_price: settings.opening_price,
            last_emitted_price: settings.opening_price,
            generator,
            wrapper: OrderBookWrapper::new(),
            participants: HashMap::new(),
            bots: Vec::new(),
            drift_times: drift_schedule(settings.duration_secs()),
            next_drift: 0,
            tick_count: 0,
            elapsed_secs: 0,
            next_order_seq: 1,
            ended: false,
            settings,
        };
        sim.spawn_bots(&mut rng);
        sim
    }

    fn spawn_bots(&mut self, rng: &mut GameRng) {
        let allowed: Vec<BotKind> = match &self.settings.bot_selection {
            Some(selection) => {
                let kinds: Vec<BotKind> = selection
                    .iter()
                    .filter_map(|s| BotKind::from_str(s))
                    .collect();
                if kinds.is_empty() {
                    BotKind::ALL.to_vec()
                } else {
                    kinds
                }
            }
            None => BotKind::ALL.to_vec(),
        };

        for i in 0..self.settings.bots {
            let kind = allowed[rng.pick_index(allowed.len())];
            let id = ParticipantId::new(format!("bot-{}-{i}", kind.as_str()));
            let participant = Participant::new(id.clone(), id.as_str(), self.settings.starting_cash)
                .with_shares(BOT_STARTING_SHARES);
            self.participants.insert(id.clone(), participant);
            self.wrapper.register_participant(id.clone());
            self.bots.push(Bot {
                kind,
                strategy: kind.build(rng.fork()),
                id,
            });
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    pub fn market_price(&self) -> Price {
        self.market_price
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn now_ms(&self) -> u64 {
        self.tick_count * TICK_INTERVAL_MS
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn volume_traded(&self) -> Cash {
        self.wrapper.total_value_processed()
    }

    pub fn highest_price(&self) -> Option<Price> {
        self.wrapper.highest_price()
    }

    pub fn lowest_price(&self) -> Option<Price> {
        self.wrapper.lowest_price()
    }

    pub fn depth(&self, levels: usize) -> (Vec<(Price, u64)>, Vec<(Price, u64)>) {
        self.wrapper.depth(levels)
    }

    pub fn intrinsic_value(&self) -> Price {
        self.generator.intrinsic_value()
    }

    pub fn guide_price(&self) -> Price {
        self.generator.guide_price()
    }

    pub fn volatility(&self) -> f64 {
        self.generator.volatility()
    }

    pub fn set_volatility(&mut self, volatility: f64) {
        self.generator.set_volatility(volatility);
    }

    /// Apply a news effect to the price model.
    pub fn apply_news_effect(&mut self, effect: NewsEffect) {
        match effect {
            NewsEffect::GuideShock {
                intensity,
                duration_ticks,
            } => self.generator.shock(intensity, Some(duration_ticks)),
            NewsEffect::IntrinsicShock { pct } => self.generator.intrinsic_shock(pct),
            NewsEffect::None => {}
        }
    }

    /// Admin debug shock on the guide price.
    pub fn market_shock(&mut self) {
        self.generator.random_shock(0.05);
    }

    /// Admin debug shock on the fundamental.
    pub fn intrinsic_shock(&mut self) {
        self.generator.drift_intrinsic(INTRINSIC_DRIFT_PCT);
    }

    /// Register a human participant. Existing ids keep their state, which is
    /// what a reconnect needs.
    pub fn add_participant(&mut self, id: ParticipantId, name: impl Into<String>) {
        if !self.participants.contains_key(&id) {
            let participant = Participant::new(id.clone(), name, self.settings.starting_cash);
            self.participants.insert(id.clone(), participant);
            self.wrapper.register_participant(id);
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn portfolio(&self, id: &ParticipantId) -> Option<Portfolio> {
        self.participants
            .get(id)
            .map(|p| p.portfolio(self.market_price))
    }

    pub fn bot_portfolios(&self) -> Vec<Portfolio> {
        self.bots
            .iter()
            .filter_map(|b| self.portfolio(&b.id))
            .collect()
    }

    pub fn grant_cash(&mut self, id: &ParticipantId, amount: Cash) -> bool {
        match self.participants.get_mut(id) {
            Some(p) => {
                p.grant_cash(amount);
                true
            }
            None => false,
        }
    }

    pub fn set_trading_disabled(&mut self, id: &ParticipantId, disabled: bool) -> bool {
        match self.participants.get_mut(id) {
            Some(p) => {
                p.set_trading_disabled(disabled);
                true
            }
            None => false,
        }
    }

    /// One game second. Advances the clock, runs scheduled intrinsic
    /// drifts, and raises `Ended` when the game duration elapses.
    pub fn clock_tick(&mut self) -> Vec<SimEvent> {
        if self.ended {
            return Vec::new();
        }
        self.elapsed_secs += 1;

        while self
            .drift_times
            .get(self.next_drift)
            .is_some_and(|&at| self.elapsed_secs >= at)
        {
            self.generator.drift_intrinsic(INTRINSIC_DRIFT_PCT);
            self.next_drift += 1;
        }

        let duration = self.settings.duration_secs();
        let mut events = vec![
            SimEvent::Clock {
                elapsed_secs: self.elapsed_secs,
                time_left_secs: duration.saturating_sub(self.elapsed_secs),
            },
            SimEvent::DebugPrices {
                intrinsic: self.generator.intrinsic_value(),
                guide: self.generator.guide_price(),
            },
        ];

        if self.elapsed_secs >= duration {
            self.ended = true;
            events.push(SimEvent::Ended);
        }
        events
    }

    /// One market tick: refresh the shared snapshot, advance the price
    /// model, poll every bot, and report the price if it moved.
    pub fn market_tick(&mut self) -> Vec<SimEvent> {
        if self.ended {
            return Vec::new();
        }
        self.tick_count += 1;
        let now_ms = self.now_ms();

        let snapshot = self.wrapper.snapshot();
        self.generator.tick();
        let guide = self.generator.guide_price();
        let intrinsic = self.generator.intrinsic_value();
        let history: Vec<Price> = self.generator.history().to_vec();
        let current = self.wrapper.last_trade_price().unwrap_or(self.market_price);
        self.market_price = current;

        let mut touched: Vec<ParticipantId> = Vec::new();
        let empty_book = crate::book::ClientBook::default();

        for i in 0..self.bots.len() {
            let bot_id = self.bots[i].id.clone();
            let (cash, shares) = match self.participants.get(&bot_id) {
                Some(p) => (p.available_cash(), p.shares()),
                None => continue,
            };

            let actions = {
                let strategy = &mut self.bots[i].strategy;
                let own = self.wrapper.client_book(&bot_id).unwrap_or(&empty_book);
                let view = MarketView {
                    tick: self.tick_count,
                    now_ms,
                    current_price: self.wrapper.last_trade_price().unwrap_or(current),
                    guide_price: guide,
                    intrinsic_value: intrinsic,
                    history: &history,
                    snapshot: &snapshot,
                    own,
                    cash,
                    shares,
                };
                match catch_unwind(AssertUnwindSafe(|| strategy.decide(&view))) {
                    Ok(actions) => actions,
                    Err(_) => {
                        tracing::warn!(bot = %bot_id, "bot decision panicked, skipping");
                        Vec::new()
                    }
                }
            };

            for action in actions {
                touched.extend(self.execute_action(&bot_id, action));
            }
        }

        let mut events = Vec::new();
        self.market_price = self.wrapper.last_trade_price().unwrap_or(self.market_price);
        if self.market_price != self.last_emitted_price {
            self.last_emitted_price = self.market_price;
            events.push(SimEvent::Price(self.market_price));
        }

        touched.sort();
        touched.dedup();
        events.extend(touched.into_iter().map(SimEvent::Portfolio));
        events
    }

    /// Submit an order on behalf of a participant (the human entry point).
    /// Emits portfolio events for everyone whose balances moved, plus a
    /// price event if the trade moved the market.
    pub fn submit(&mut self, participant: &ParticipantId, request: OrderRequest) -> Vec<SimEvent> {
        let action = match request {
            OrderRequest::Limit {
                side,
                price,
                quantity,
            } => BotAction::SubmitLimit {
                side,
                price,
                quantity,
            },
            OrderRequest::Market { side, quantity } => BotAction::SubmitMarket { side, quantity },
        };

        let mut touched = self.execute_action(participant, action);
        touched.sort();
        touched.dedup();

        let mut events: Vec<SimEvent> = touched.into_iter().map(SimEvent::Portfolio).collect();
        self.market_price = self.wrapper.last_trade_price().unwrap_or(self.market_price);
        if self.market_price != self.last_emitted_price {
            self.last_emitted_price = self.market_price;
            events.push(SimEvent::Price(self.market_price));
        }
        events
    }

    fn next_order_id(&mut self, owner: &ParticipantId) -> OrderId {
        let id = OrderId::new(owner, self.next_order_seq);
        self.next_order_seq += 1;
        id
    }

    /// Execute one action. Accounting preconditions that fail (not enough
    /// cash or shares, trading disabled) drop the order silently; the
    /// participant simply observes no change.
    fn execute_action(&mut self, actor: &ParticipantId, action: BotAction) -> Vec<ParticipantId> {
        match action {
            BotAction::SubmitLimit {
                side,
                price,
                quantity,
            } => {
                if quantity == 0 || price < Price::MIN_TICK {
                    return Vec::new();
                }
                let order_id = self.next_order_id(actor);
                let Some(participant) = self.participants.get_mut(actor) else {
                    return Vec::new();
                };
                let placed = match side {
                    Side::Buy => participant.place_buy(order_id.clone(), price, quantity).map(|_| ()),
                    Side::Sell => participant.place_sell(order_id.clone(), quantity),
                };
                if placed.is_err() {
                    return Vec::new();
                }

                let now_ms = self.now_ms();
                let fills = self.wrapper.add_limit(order_id, side, price, quantity, now_ms);
                let mut touched = self.route_fills(&fills);
                touched.push(actor.clone());
                touched
            }

            BotAction::SubmitMarket { side, quantity } => {
                if quantity == 0 {
                    return Vec::new();
                }
                // A market order against an empty opposite side leaves the
                // participant untouched.
                let reference = match side {
                    Side::Buy => self.wrapper.best_ask(),
                    Side::Sell => self.wrapper.best_bid(),
                };
                let Some(reference) = reference else {
                    return Vec::new();
                };

                let order_id = self.next_order_id(actor);
                let Some(participant) = self.participants.get_mut(actor) else {
                    return Vec::new();
                };
                let budget = match side {
                    Side::Buy => {
                        match participant.place_buy(order_id.clone(), reference, quantity) {
                            Ok(budget) => Some(budget),
                            Err(_) => return Vec::new(),
                        }
                    }
                    Side::Sell => {
                        if participant.place_sell(order_id.clone(), quantity).is_err() {
                            return Vec::new();
                        }
                        None
                    }
                };

                let outcome = self.wrapper.add_market(order_id.clone(), side, quantity, budget);
                let mut touched = self.route_fills(&outcome.fills);
                // Whatever lock the fills did not consume goes back.
                if let Some(participant) = self.participants.get_mut(actor) {
                    participant.release(&order_id);
                }
                touched.push(actor.clone());
                touched
            }

            BotAction::Cancel(order_id) => {
                // Participants may only cancel their own orders.
                if &order_id.owner() != actor {
                    return Vec::new();
                }
                self.cancel_order(&order_id)
            }
        }
    }

    /// Cancel a live order and release its lock. Idempotent.
    pub fn cancel_order(&mut self, order_id: &OrderId) -> Vec<ParticipantId> {
        match self.wrapper.cancel(order_id) {
            Some(cancelled) => {
                if let Some(p) = self.participants.get_mut(&cancelled.participant) {
                    p.release(&cancelled.order_id);
                }
                vec![cancelled.participant]
            }
            None => Vec::new(),
        }
    }

    fn route_fills(&mut self, fills: &[FillReport]) -> Vec<ParticipantId> {
        let mut touched = Vec::with_capacity(fills.len());
        for fill in fills {
            if let Some(p) = self.participants.get_mut(&fill.participant) {
                p.apply_fill(fill);
                touched.push(fill.participant.clone());
            }
        }
        touched
    }

    /// Snapshot for external observers (spectators, tests).
    pub fn snapshot(&self) -> BookSnapshot {
        self.wrapper.snapshot()
    }
}

/// Schedule the intrinsic drift times: the game split into about ten
/// segments at least 8 s apart, stopping 8 s before the end.
fn drift_schedule(duration_secs: u64) -> Vec<u64> {
    let step = (duration_secs / DRIFT_SEGMENTS).max(DRIFT_SPACING_SECS);
    (1..=DRIFT_SEGMENTS)
        .map(|i| i * step)
        .take_while(|&t| t + DRIFT_SPACING_SECS <= duration_secs)
        .collect()
}

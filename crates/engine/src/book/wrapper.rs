//! Order-book wrapper: per-participant order tracking and fill reporting.
//!
//! The wrapper owns the real matching book plus one lightweight index per
//! registered participant (the "per-client book"), so strategies can answer
//! "do I already have an order at this price on this side" without walking
//! the whole book, and fills can be reconciled against the owner's locked
//! balances.
//!
//! Fill reports use a sign convention: buy fills carry positive quantity and
//! positive cost, sell fills negative quantity and negative cost. The
//! participant routes the two cases on the sign alone.

use super::matching::MatchingBook;
use super::order::{Order, Trade};
use pit_core::{Cash, OrderId, ParticipantId, Price, Side};
use std::collections::HashMap;

/// A live order as seen from its owner's per-client book.
#[derive(Debug, Clone)]
pub struct ClientOrder {
    pub id: OrderId,
    pub quantity: u64,
    pub placed_at_ms: u64,
}

/// Per-participant index of live orders, one map per side keyed by price.
#[derive(Debug, Default)]
pub struct ClientBook {
    bids: HashMap<Price, Vec<ClientOrder>>,
    asks: HashMap<Price, Vec<ClientOrder>>,
}

impl ClientBook {
    fn side(&self, side: Side) -> &HashMap<Price, Vec<ClientOrder>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut HashMap<Price, Vec<ClientOrder>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Is there a live order at exactly this price?
    pub fn has_order_at(&self, side: Side, price: Price) -> bool {
        self.side(side).get(&price).is_some_and(|v| !v.is_empty())
    }

    /// Any live order on this side at all?
    pub fn has_orders(&self, side: Side) -> bool {
        self.side(side).values().any(|v| !v.is_empty())
    }

    /// Number of distinct price levels this participant occupies on a side.
    pub fn level_count(&self, side: Side) -> usize {
        self.side(side).values().filter(|v| !v.is_empty()).count()
    }

    /// All live orders on a side, in no particular order.
    pub fn orders(&self, side: Side) -> impl Iterator<Item = &ClientOrder> {
        self.side(side).values().flatten()
    }

    /// Live orders on a side together with their resting price.
    pub fn orders_with_price(&self, side: Side) -> impl Iterator<Item = (Price, &ClientOrder)> {
        self.side(side)
            .iter()
            .flat_map(|(price, orders)| orders.iter().map(move |o| (*price, o)))
    }

    /// Ids of orders on `side` placed at or before `cutoff_ms`.
    pub fn stale_orders(&self, side: Side, cutoff_ms: u64) -> Vec<OrderId> {
        self.orders(side)
            .filter(|o| o.placed_at_ms <= cutoff_ms)
            .map(|o| o.id.clone())
            .collect()
    }

    pub fn total_quantity(&self, side: Side, price: Price) -> u64 {
        self.side(side)
            .get(&price)
            .map(|v| v.iter().map(|o| o.quantity).sum())
            .unwrap_or(0)
    }

    pub(crate) fn add(&mut self, side: Side, price: Price, order: ClientOrder) {
        self.side_mut(side).entry(price).or_default().push(order);
    }

    /// Reduce the tracked quantity of an order after a fill, dropping it once
    /// fully consumed.
    fn reduce(&mut self, side: Side, price: Price, order_id: &OrderId, by: u64) {
        let levels = self.side_mut(side);
        if let Some(orders) = levels.get_mut(&price) {
            if let Some(order) = orders.iter_mut().find(|o| &o.id == order_id) {
                order.quantity = order.quantity.saturating_sub(by);
            }
            orders.retain(|o| o.quantity > 0);
            if orders.is_empty() {
                levels.remove(&price);
            }
        }
    }

    fn remove(&mut self, side: Side, price: Price, order_id: &OrderId) {
        let levels = self.side_mut(side);
        if let Some(orders) = levels.get_mut(&price) {
            orders.retain(|o| &o.id != order_id);
            if orders.is_empty() {
                levels.remove(&price);
            }
        }
    }
}

/// A settled fill, signed by side, addressed to the owning participant.
#[derive(Debug, Clone)]
pub struct FillReport {
    pub participant: ParticipantId,
    pub order_id: OrderId,
    pub price: Price,
    /// Positive for buys, negative for sells.
    pub quantity: i64,
    /// Positive for buys, negative for sells.
    pub cost: Cash,
}

/// Aggregate result of a market order, reported before individual fills.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketTotals {
    pub total_cost: Cash,
    pub total_quantity: u64,
}

/// Outcome of a market order submission.
#[derive(Debug)]
pub struct MarketOutcome {
    pub totals: MarketTotals,
    pub fills: Vec<FillReport>,
    pub leftover: u64,
}

/// Immutable per-level view of the book.
#[derive(Debug, Clone, Default)]
pub struct BookSnapshot {
    /// Best (highest) bid first.
    pub bids: Vec<(Price, u64)>,
    /// Best (lowest) ask first.
    pub asks: Vec<(Price, u64)>,
}

impl BookSnapshot {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|(p, _)| *p)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|(p, _)| *p)
    }

    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price::from_cents((bid.cents() + ask.cents()) / 2)),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }
}

/// Information needed to release a cancelled order's locked resources.
#[derive(Debug, Clone)]
pub struct CancelledOrder {
    pub participant: ParticipantId,
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub remaining: u64,
}

/// The matching book plus participant bookkeeping and market aggregates.
#[derive(Debug, Default)]
pub struct OrderBookWrapper {
    book: MatchingBook,
    clients: HashMap<ParticipantId, ClientBook>,
    last_trade_price: Option<Price>,
    total_value_processed: Cash,
    highest_price: Option<Price>,
    lowest_price: Option<Price>,
}

impl OrderBookWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a participant known to the wrapper. Fills for unknown owners are
    /// still settled against the book but produce no per-client tracking.
    pub fn register_participant(&mut self, id: ParticipantId) {
        self.clients.entry(id).or_default();
    }

    pub fn client_book(&self, id: &ParticipantId) -> Option<&ClientBook> {
        self.clients.get(id)
    }

    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price
    }

    pub fn total_value_processed(&self) -> Cash {
        self.total_value_processed
    }

    pub fn highest_price(&self) -> Option<Price> {
        self.highest_price
    }

    pub fn lowest_price(&self) -> Option<Price> {
        self.lowest_price
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    /// Submit a limit order. Immediate crossings are settled and reported;
    /// any remainder rests on the book under the owner's per-client book.
    pub fn add_limit(
        &mut self,
        order_id: OrderId,
        side: Side,
        price: Price,
        quantity: u64,
        now_ms: u64,
    ) -> Vec<FillReport> {
        let mut taker = Order::new(order_id.clone(), side, price, quantity, now_ms);
        let trades = self.book.match_limit(&mut taker);
        let reports = self.settle_trades(&trades);

        if taker.remaining() > 0 {
            let owner = order_id.owner();
            if let Some(client) = self.clients.get_mut(&owner) {
                client.add(
                    side,
                    price,
                    ClientOrder {
                        id: order_id,
                        quantity: taker.remaining(),
                        placed_at_ms: now_ms,
                    },
                );
            }
            self.book.insert(taker);
        }

        reports
    }

    /// Submit a market order. Maker fills are reported per trade; the taker's
    /// fills are synthesised per executed price level. `budget` caps total
    /// spend for buys. The leftover quantity is never rested.
    pub fn add_market(
        &mut self,
        order_id: OrderId,
        side: Side,
        quantity: u64,
        budget: Option<Cash>,
    ) -> MarketOutcome {
        let (trades, leftover) = self.book.match_market(&order_id, side, quantity, budget);

        let mut fills = Vec::new();
        let mut totals = MarketTotals::default();
        let mut level_fills: Vec<(Price, u64)> = Vec::new();

        for trade in &trades {
            self.record_trade(trade);
            fills.push(self.maker_report(trade));
            match level_fills.last_mut() {
                Some((price, qty)) if *price == trade.price => *qty += trade.quantity,
                _ => level_fills.push((trade.price, trade.quantity)),
            }
            totals.total_quantity += trade.quantity;
            totals.total_cost += trade.price.notional(trade.quantity);
        }

        let taker = order_id.owner();
        for (price, qty) in level_fills {
            let sign = side.sign();
            fills.push(FillReport {
                participant: taker.clone(),
                order_id: order_id.clone(),
                price,
                quantity: sign * qty as i64,
                cost: if sign > 0 {
                    price.notional(qty)
                } else {
                    -price.notional(qty)
                },
            });
        }

        MarketOutcome {
            totals,
            fills,
            leftover,
        }
    }

    /// Cancel a live order. Unknown ids are a no-op, making cancel safe to
    /// call twice.
    pub fn cancel(&mut self, order_id: &OrderId) -> Option<CancelledOrder> {
        let order = self.book.remove(order_id)?;
        let owner = order_id.owner();
        if let Some(client) = self.clients.get_mut(&owner) {
            client.remove(order.side, order.price, order_id);
        }
        Some(CancelledOrder {
            participant: owner,
            order_id: order_id.clone(),
            side: order.side,
            price: order.price,
            remaining: order.remaining(),
        })
    }

    /// Per-level snapshot of the whole book.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            bids: self.book.bid_levels(usize::MAX),
            asks: self.book.ask_levels(usize::MAX),
        }
    }

    /// Aggregated depth: `(bids desc, asks asc)`, truncated to `levels`.
    pub fn depth(&self, levels: usize) -> (Vec<(Price, u64)>, Vec<(Price, u64)>) {
        (self.book.bid_levels(levels), self.book.ask_levels(levels))
    }

    /// Settle limit-order trades: update aggregates, reconcile maker client
    /// books, and emit maker+taker reports in execution order.
    fn settle_trades(&mut self, trades: &[Trade]) -> Vec<FillReport> {
        let mut reports = Vec::with_capacity(trades.len() * 2);
        for trade in trades {
            self.record_trade(trade);
            reports.push(self.maker_report(trade));

            let taker = trade.taker_id.owner();
            let sign = trade.taker_side.sign();
            reports.push(FillReport {
                participant: taker,
                order_id: trade.taker_id.clone(),
                price: trade.price,
                quantity: sign * trade.quantity as i64,
                cost: if sign > 0 {
                    trade.price.notional(trade.quantity)
                } else {
                    -trade.price.notional(trade.quantity)
                },
            });
        }
        reports
    }

    /// Build the maker-side report for a trade and shrink the maker's
    /// per-client book entry.
    fn maker_report(&mut self, trade: &Trade) -> FillReport {
        let maker_side = trade.taker_side.opposite();
        let maker = trade.maker_id.owner();
        if let Some(client) = self.clients.get_mut(&maker) {
            client.reduce(maker_side, trade.price, &trade.maker_id, trade.quantity);
        }
        let sign = maker_side.sign();
        FillReport {
            participant: maker,
            order_id: trade.maker_id.clone(),
            price: trade.price,
            quantity: sign * trade.quantity as i64,
            cost: if sign > 0 {
                trade.price.notional(trade.quantity)
            } else {
                -trade.price.notional(trade.quantity)
            },
        }
    }

    fn record_trade(&mut self, trade: &Trade) {
        self.last_trade_price = Some(trade.price);
        self.total_value_processed += trade.price.notional(trade.quantity);
        self.highest_price = Some(match self.highest_price {
            Some(h) if h >= trade.price => h,
            _ => trade.price,
        });
        self.lowest_price = Some(match self.lowest_price {
            Some(l) if l <= trade.price => l,
            _ => trade.price,
        });
    }
}

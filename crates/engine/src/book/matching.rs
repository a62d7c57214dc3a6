//! Price-time priority matching book.
//!
//! A single-instrument limit order book. Bids and asks are kept in
//! `BTreeMap`s keyed so that the first entry is always the best level, with
//! FIFO queues per level. Aggregate per-level quantities are tracked
//! separately so depth snapshots never walk the queues.

use super::order::{Order, Trade};
use indexmap::IndexMap;
use pit_core::{Cash, OrderId, Price, Side};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Price key ordering both sides so `first_key_value` is the best level.
/// Bids sort descending, asks ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PriceKey {
    price: Price,
    is_bid: bool,
}

impl PriceKey {
    fn bid(price: Price) -> Self {
        PriceKey {
            price,
            is_bid: true,
        }
    }

    fn ask(price: Price) -> Self {
        PriceKey {
            price,
            is_bid: false,
        }
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.is_bid {
            other.price.cmp(&self.price)
        } else {
            self.price.cmp(&other.price)
        }
    }
}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct MatchingBook {
    bids: BTreeMap<PriceKey, VecDeque<Order>>,
    asks: BTreeMap<PriceKey, VecDeque<Order>>,
    /// Lookup for cancels: order id -> (side, price level).
    index: HashMap<OrderId, (Side, Price)>,
    /// Total live quantity per price level.
    bid_quantities: IndexMap<Price, u64>,
    ask_quantities: IndexMap<Price, u64>,
}

impl MatchingBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first_key_value().map(|(k, _)| k.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first_key_value().map(|(k, _)| k.price)
    }

    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Rest an order on the book. The order must not be marketable; crossing
    /// is the caller's job via [`MatchingBook::match_limit`].
    pub fn insert(&mut self, order: Order) {
        let side = order.side;
        let price = order.price;
        let remaining = order.remaining();
        self.index.insert(order.id.clone(), (side, price));

        match side {
            Side::Buy => {
                self.bids
                    .entry(PriceKey::bid(price))
                    .or_default()
                    .push_back(order);
                *self.bid_quantities.entry(price).or_insert(0) += remaining;
            }
            Side::Sell => {
                self.asks
                    .entry(PriceKey::ask(price))
                    .or_default()
                    .push_back(order);
                *self.ask_quantities.entry(price).or_insert(0) += remaining;
            }
        }
    }

    /// Remove a resting order. Returns `None` when the id is unknown, which
    /// makes cancellation idempotent.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let (side, price) = self.index.remove(order_id)?;

        let (levels, quantities, key) = match side {
            Side::Buy => (
                &mut self.bids,
                &mut self.bid_quantities,
                PriceKey::bid(price),
            ),
            Side::Sell => (
                &mut self.asks,
                &mut self.ask_quantities,
                PriceKey::ask(price),
            ),
        };

        let queue = levels.get_mut(&key)?;
        let pos = queue.iter().position(|o| &o.id == order_id)?;
        let order = queue.remove(pos)?;

        if let Some(qty) = quantities.get_mut(&price) {
            *qty = qty.saturating_sub(order.remaining());
            if *qty == 0 {
                quantities.swap_remove(&price);
            }
        }
        if queue.is_empty() {
            levels.remove(&key);
        }

        Some(order)
    }

    /// Cross an incoming limit order against the opposing side.
    ///
    /// Fills happen at resting prices while the limit allows it. The caller
    /// rests any remainder. Trades are returned in execution order.
    pub fn match_limit(&mut self, taker: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        loop {
            if taker.remaining() == 0 {
                break;
            }
            let crossable = match taker.side {
                Side::Buy => self.best_ask().is_some_and(|ask| taker.price >= ask),
                Side::Sell => self.best_bid().is_some_and(|bid| taker.price <= bid),
            };
            if !crossable {
                break;
            }
            let level_trades = self.fill_best_level(taker, None);
            if level_trades.is_empty() {
                break;
            }
            trades.extend(level_trades);
        }
        trades
    }

    /// Execute a market order against the opposing side.
    ///
    /// Buy orders may carry a cash `budget`; filling stops before a slice
    /// that would overspend it, so the taker's locked cash always covers the
    /// total cost. Returns the trades and the unfilled leftover quantity.
    pub fn match_market(
        &mut self,
        taker_id: &OrderId,
        side: Side,
        quantity: u64,
        budget: Option<Cash>,
    ) -> (Vec<Trade>, u64) {
        let mut taker = Order::new(taker_id.clone(), side, Price::ZERO, quantity, 0);
        let mut trades = Vec::new();
        let mut budget_left = budget;

        loop {
            if taker.remaining() == 0 {
                break;
            }
            let opposing_best = match side {
                Side::Buy => self.best_ask(),
                Side::Sell => self.best_bid(),
            };
            if opposing_best.is_none() {
                break;
            }
            let level_trades = self.fill_best_level(&mut taker, budget_left);
            if level_trades.is_empty() {
                break;
            }
            if let Some(ref mut b) = budget_left {
                for t in &level_trades {
                    *b -= t.price.notional(t.quantity);
                }
            }
            trades.extend(level_trades);
        }

        (trades, taker.remaining())
    }

    /// FIFO-fill the best opposing level against `taker`.
    fn fill_best_level(&mut self, taker: &mut Order, budget: Option<Cash>) -> Vec<Trade> {
        let (levels, quantities) = match taker.side {
            Side::Buy => (&mut self.asks, &mut self.ask_quantities),
            Side::Sell => (&mut self.bids, &mut self.bid_quantities),
        };

        let Some((&key, _)) = levels.first_key_value() else {
            return Vec::new();
        };
        let level_price = key.price;
        let Some(queue) = levels.get_mut(&key) else {
            return Vec::new();
        };

        let mut trades = Vec::new();
        let mut budget_left = budget;

        while taker.remaining() > 0 {
            let Some(maker) = queue.front_mut() else {
                break;
            };

            let mut fill_qty = taker.remaining().min(maker.remaining());
            if let Some(b) = budget_left {
                let affordable = (b.cents() / level_price.cents().max(1)) as u64;
                fill_qty = fill_qty.min(affordable);
            }
            if fill_qty == 0 {
                // Either the maker queue is drained or the budget is spent.
                break;
            }

            taker.fill(fill_qty);
            maker.fill(fill_qty);
            if let Some(ref mut b) = budget_left {
                *b -= level_price.notional(fill_qty);
            }

            trades.push(Trade {
                price: level_price,
                quantity: fill_qty,
                maker_id: maker.id.clone(),
                taker_id: taker.id.clone(),
                taker_side: taker.side,
            });

            if maker.is_filled() {
                self.index.remove(&maker.id);
                queue.pop_front();
            }
        }

        let filled: u64 = trades.iter().map(|t| t.quantity).sum();
        if let Some(qty) = quantities.get_mut(&level_price) {
            *qty = qty.saturating_sub(filled);
            if *qty == 0 {
                quantities.swap_remove(&level_price);
            }
        }
        if queue.is_empty() {
            levels.remove(&key);
        }

        trades
    }

    /// Top bid levels, best (highest) first.
    pub fn bid_levels(&self, depth: usize) -> Vec<(Price, u64)> {
        let mut levels: Vec<_> = self
            .bid_quantities
            .iter()
            .map(|(price, qty)| (*price, *qty))
            .collect();
        levels.sort_by(|a, b| b.0.cmp(&a.0));
        levels.truncate(depth);
        levels
    }

    /// Top ask levels, best (lowest) first.
    pub fn ask_levels(&self, depth: usize) -> Vec<(Price, u64)> {
        let mut levels: Vec<_> = self
            .ask_quantities
            .iter()
            .map(|(price, qty)| (*price, *qty))
            .collect();
        levels.sort_by(|a, b| a.0.cmp(&b.0));
        levels.truncate(depth);
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pit_core::ParticipantId;

    fn oid(owner: &str, seq: u64) -> OrderId {
        OrderId::new(&ParticipantId::new(owner), seq)
    }

    fn resting(owner: &str, seq: u64, side: Side, price: i64, qty: u64) -> Order {
        Order::new(oid(owner, seq), side, Price::from_cents(price), qty, 0)
    }

    #[test]
    fn test_insert_and_best_prices() {
        let mut book = MatchingBook::new();
        book.insert(resting("a", 1, Side::Buy, 990, 10));
        book.insert(resting("a", 2, Side::Buy, 995, 10));
        book.insert(resting("b", 3, Side::Sell, 1005, 10));
        book.insert(resting("b", 4, Side::Sell, 1010, 10));

        assert_eq!(book.best_bid(), Some(Price::from_cents(995)));
        assert_eq!(book.best_ask(), Some(Price::from_cents(1005)));
        assert_eq!(book.order_count(), 4);
    }

    #[test]
    fn test_limit_match_fifo_at_level() {
        let mut book = MatchingBook::new();
        book.insert(resting("m1", 1, Side::Sell, 1000, 5));
        book.insert(resting("m2", 2, Side::Sell, 1000, 10));

        let mut taker = resting("t", 3, Side::Buy, 1000, 8);
        let trades = book.match_limit(&mut taker);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].quantity, 5);
        assert_eq!(trades[0].maker_id, oid("m1", 1));
        assert_eq!(trades[1].quantity, 3);
        assert_eq!(trades[1].maker_id, oid("m2", 2));
        assert_eq!(taker.remaining(), 0);
        // m1 fully gone, m2 partially filled but still resting
        assert!(!book.contains(&oid("m1", 1)));
        assert!(book.contains(&oid("m2", 2)));
        assert_eq!(book.ask_levels(1), vec![(Price::from_cents(1000), 7)]);
    }

    #[test]
    fn test_limit_respects_price() {
        let mut book = MatchingBook::new();
        book.insert(resting("m", 1, Side::Sell, 1010, 10));

        let mut taker = resting("t", 2, Side::Buy, 1000, 10);
        let trades = book.match_limit(&mut taker);
        assert!(trades.is_empty());
        assert_eq!(taker.remaining(), 10);
    }

    #[test]
    fn test_fills_execute_at_resting_price() {
        let mut book = MatchingBook::new();
        book.insert(resting("m", 1, Side::Sell, 990, 10));

        // Buyer willing to pay more still trades at the maker's price.
        let mut taker = resting("t", 2, Side::Buy, 1050, 10);
        let trades = book.match_limit(&mut taker);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Price::from_cents(990));
    }

    #[test]
    fn test_market_walks_levels_and_reports_leftover() {
        let mut book = MatchingBook::new();
        book.insert(resting("m", 1, Side::Sell, 1000, 5));
        book.insert(resting("m", 2, Side::Sell, 1010, 5));

        let (trades, leftover) = book.match_market(&oid("t", 3), Side::Buy, 15, None);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, Price::from_cents(1000));
        assert_eq!(trades[1].price, Price::from_cents(1010));
        assert_eq!(leftover, 5);
        assert!(book.is_empty());
    }

    #[test]
    fn test_market_against_empty_side() {
        let mut book = MatchingBook::new();
        let (trades, leftover) = book.match_market(&oid("t", 1), Side::Sell, 7, None);
        assert!(trades.is_empty());
        assert_eq!(leftover, 7);
    }

    #[test]
    fn test_market_buy_stops_at_budget() {
        let mut book = MatchingBook::new();
        book.insert(resting("m", 1, Side::Sell, 1000, 5));
        book.insert(resting("m", 2, Side::Sell, 2000, 5));

        // Budget covers the first level plus two shares of the second.
        let budget = Cash::from_cents(5 * 1000 + 2 * 2000 + 1999);
        let (trades, leftover) = book.match_market(&oid("t", 3), Side::Buy, 10, Some(budget));

        let spent: i64 = trades
            .iter()
            .map(|t| t.price.notional(t.quantity).cents())
            .sum();
        assert!(spent <= budget.cents());
        assert_eq!(trades.iter().map(|t| t.quantity).sum::<u64>(), 7);
        assert_eq!(leftover, 3);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut book = MatchingBook::new();
        book.insert(resting("a", 1, Side::Buy, 990, 10));

        assert!(book.remove(&oid("a", 1)).is_some());
        assert!(book.remove(&oid("a", 1)).is_none());
        assert!(book.is_empty());
        assert!(book.bid_levels(10).is_empty());
    }
}

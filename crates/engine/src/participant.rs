//! Participant accounting: cash, shares, and the locked balances that back
//! open orders.
//!
//! The accounting contract: placing an order moves the resource needed to
//! settle it from available to locked (cash for buys, shares for sells);
//! fills consume the lock and credit the counter-resource; cancellation
//! returns the remaining lock. All four balances stay non-negative after
//! every operation, and an operation whose precondition fails changes
//! nothing.

use crate::book::FillReport;
use pit_core::{Cash, OrderId, ParticipantId, Price, Side};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("insufficient available cash")]
    InsufficientCash,
    #[error("insufficient shares")]
    InsufficientShares,
    #[error("trading is disabled for this participant")]
    TradingDisabled,
}

/// Remaining lock backing one open order.
///
/// Buy locks are tracked as a cash amount rather than price × quantity:
/// fills can execute below the limit price, and whatever is left of the
/// amount when the order completes is refunded.
#[derive(Debug, Clone)]
struct OpenLock {
    side: Side,
    locked_cash: Cash,
    qty_open: u64,
}

/// Portfolio snapshot with mark-to-market P&L.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub id: ParticipantId,
    pub cash: Cash,
    pub shares: u64,
    pub pnl: Cash,
}

/// Cash/share accounting shared by humans and bots.
#[derive(Debug)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    initial_cash: Cash,
    available_cash: Cash,
    locked_cash: Cash,
    shares: u64,
    locked_shares: u64,
    trading_disabled: bool,
    open: HashMap<OrderId, OpenLock>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, initial_cash: Cash) -> Self {
        Self {
            id,
            name: name.into(),
            initial_cash,
            available_cash: initial_cash,
            locked_cash: Cash::ZERO,
            shares: 0,
            locked_shares: 0,
            trading_disabled: false,
            open: HashMap::new(),
        }
    }

    pub fn with_shares(mut self, shares: u64) -> Self {
        self.shares = shares;
        self
    }

    pub fn available_cash(&self) -> Cash {
        self.available_cash
    }

    pub fn locked_cash(&self) -> Cash {
        self.locked_cash
    }

    pub fn shares(&self) -> u64 {
        self.shares
    }

    pub fn locked_shares(&self) -> u64 {
        self.locked_shares
    }

    pub fn initial_cash(&self) -> Cash {
        self.initial_cash
    }

    pub fn trading_disabled(&self) -> bool {
        self.trading_disabled
    }

    pub fn set_trading_disabled(&mut self, disabled: bool) {
        self.trading_disabled = disabled;
    }

    /// Credit cash directly (power payouts).
    pub fn grant_cash(&mut self, amount: Cash) {
        self.available_cash += amount;
    }

    /// Lock cash for a buy order at `price`. For market buys the caller
    /// passes the current best ask. Returns the locked amount, which doubles
    /// as the spend budget for market execution.
    pub fn place_buy(
        &mut self,
        order_id: OrderId,
        price: Price,
        quantity: u64,
    ) -> Result<Cash, AccountError> {
        if self.trading_disabled {
            return Err(AccountError::TradingDisabled);
        }
        let required = price.notional(quantity);
        if self.available_cash < required {
            return Err(AccountError::InsufficientCash);
        }
        self.available_cash -= required;
        self.locked_cash += required;
        self.open.insert(
            order_id,
            OpenLock {
                side: Side::Buy,
                locked_cash: required,
                qty_open: quantity,
            },
        );
        Ok(required)
    }

    /// Lock shares for a sell order.
    pub fn place_sell(&mut self, order_id: OrderId, quantity: u64) -> Result<(), AccountError> {
        if self.trading_disabled {
            return Err(AccountError::TradingDisabled);
        }
        if self.shares < quantity {
            return Err(AccountError::InsufficientShares);
        }
        self.shares -= quantity;
        self.locked_shares += quantity;
        self.open.insert(
            order_id,
            OpenLock {
                side: Side::Sell,
                locked_cash: Cash::ZERO,
                qty_open: quantity,
            },
        );
        Ok(())
    }

    /// Settle a fill. Buy fills (positive cost) consume locked cash and
    /// credit shares; sell fills (negative cost) consume locked shares and
    /// credit cash. Once an order is fully filled its residual lock is
    /// refunded, so price improvement flows back to available cash.
    pub fn apply_fill(&mut self, fill: &FillReport) {
        let qty = fill.quantity.unsigned_abs();
        if fill.cost > Cash::ZERO {
            let consumed = match self.open.get_mut(&fill.order_id) {
                Some(lock) => {
                    let deduct = fill.cost.min(lock.locked_cash);
                    lock.locked_cash -= deduct;
                    lock.qty_open = lock.qty_open.saturating_sub(qty);
                    let done = lock.qty_open == 0;
                    let residue = lock.locked_cash;
                    if done {
                        self.open.remove(&fill.order_id);
                        self.locked_cash -= residue;
                        self.available_cash += residue;
                    }
                    deduct
                }
                None => Cash::ZERO,
            };
            self.locked_cash -= consumed;
            // A fill can only exceed its lock if the order was never placed
            // through this participant; settle the difference from available.
            let shortfall = fill.cost - consumed;
            if shortfall > Cash::ZERO {
                self.available_cash -= shortfall;
            }
            self.shares += qty;
        } else {
            // Sell: cost is negative, subtracting it credits the proceeds.
            self.available_cash -= fill.cost;
            let released = qty.min(self.locked_shares);
            self.locked_shares -= released;
            if let Some(lock) = self.open.get_mut(&fill.order_id) {
                lock.qty_open = lock.qty_open.saturating_sub(qty);
                if lock.qty_open == 0 {
                    self.open.remove(&fill.order_id);
                }
            }
        }
    }

    /// Return an order's remaining lock to the available side. Used for
    /// cancels and for market-order leftovers. Unknown ids are a no-op.
    pub fn release(&mut self, order_id: &OrderId) {
        if let Some(lock) = self.open.remove(order_id) {
            match lock.side {
                Side::Buy => {
                    self.locked_cash -= lock.locked_cash;
                    self.available_cash += lock.locked_cash;
                }
                Side::Sell => {
                    self.locked_shares -= lock.qty_open;
                    self.shares += lock.qty_open;
                }
            }
        }
    }

    /// Mark-to-market P&L at `current_price`, counting locked balances at
    /// full value.
    pub fn pnl(&self, current_price: Price) -> Cash {
        let equity = self.available_cash
            + self.locked_cash
            + current_price.notional(self.shares + self.locked_shares);
        equity - self.initial_cash
    }

    pub fn portfolio(&self, current_price: Price) -> Portfolio {
        Portfolio {
            id: self.id.clone(),
            cash: self.available_cash,
            shares: self.shares,
            pnl: self.pnl(current_price),
        }
    }

    /// Balance sanity: all four balances non-negative.
    #[cfg(test)]
    fn balances_ok(&self) -> bool {
        self.available_cash >= Cash::ZERO && self.locked_cash >= Cash::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pit_core::ParticipantId;

    fn participant(cash: i64) -> Participant {
        Participant::new(ParticipantId::new("p1"), "p1", Cash::from_int(cash))
    }

    fn oid(seq: u64) -> OrderId {
        OrderId::new(&ParticipantId::new("p1"), seq)
    }

    fn buy_fill(order: &OrderId, price_cents: i64, qty: u64) -> FillReport {
        FillReport {
            participant: ParticipantId::new("p1"),
            order_id: order.clone(),
            price: Price::from_cents(price_cents),
            quantity: qty as i64,
            cost: Cash::from_cents(price_cents * qty as i64),
        }
    }

    fn sell_fill(order: &OrderId, price_cents: i64, qty: u64) -> FillReport {
        FillReport {
            participant: ParticipantId::new("p1"),
            order_id: order.clone(),
            price: Price::from_cents(price_cents),
            quantity: -(qty as i64),
            cost: Cash::from_cents(-price_cents * qty as i64),
        }
    }

    #[test]
    fn test_place_buy_locks_cash() {
        let mut p = participant(1000);
        p.place_buy(oid(1), Price::from_int(10), 50).unwrap();

        assert_eq!(p.available_cash(), Cash::from_int(500));
        assert_eq!(p.locked_cash(), Cash::from_int(500));
        assert!(p.balances_ok());
    }

    #[test]
    fn test_place_buy_insufficient_cash_changes_nothing() {
        let mut p = participant(100);
        let err = p.place_buy(oid(1), Price::from_int(10), 50).unwrap_err();
        assert_eq!(err, AccountError::InsufficientCash);
        assert_eq!(p.available_cash(), Cash::from_int(100));
        assert_eq!(p.locked_cash(), Cash::ZERO);
    }

    #[test]
    fn test_place_sell_locks_shares() {
        let mut p = participant(0).with_shares(30);
        p.place_sell(oid(1), 20).unwrap();
        assert_eq!(p.shares(), 10);
        assert_eq!(p.locked_shares(), 20);

        assert_eq!(
            p.place_sell(oid(2), 11).unwrap_err(),
            AccountError::InsufficientShares
        );
    }

    #[test]
    fn test_buy_fill_settles_from_lock() {
        let mut p = participant(1000);
        p.place_buy(oid(1), Price::from_int(10), 50).unwrap();
        p.apply_fill(&buy_fill(&oid(1), 1000, 20));

        assert_eq!(p.shares(), 20);
        assert_eq!(p.locked_cash(), Cash::from_int(300));
        assert_eq!(p.available_cash(), Cash::from_int(500));
        assert!(p.balances_ok());
    }

    #[test]
    fn test_full_fill_refunds_price_improvement() {
        // Limit buy at 10.00 fills entirely at 9.00: the unspent cent
        // difference flows back to available cash.
        let mut p = participant(1000);
        p.place_buy(oid(1), Price::from_int(10), 50).unwrap();
        p.apply_fill(&buy_fill(&oid(1), 900, 50));

        assert_eq!(p.shares(), 50);
        assert_eq!(p.locked_cash(), Cash::ZERO);
        assert_eq!(p.available_cash(), Cash::from_int(1000 - 450));
    }

    #[test]
    fn test_sell_fill_credits_proceeds() {
        let mut p = participant(0).with_shares(40);
        p.place_sell(oid(1), 40).unwrap();
        p.apply_fill(&sell_fill(&oid(1), 1200, 15));

        assert_eq!(p.available_cash(), Cash::from_cents(1200 * 15));
        assert_eq!(p.locked_shares(), 25);
        assert_eq!(p.shares(), 0);
    }

    #[test]
    fn test_cancel_roundtrip_restores_balances() {
        let mut p = participant(500);
        p.place_buy(oid(1), Price::from_int(5), 40).unwrap();
        p.release(&oid(1));
        assert_eq!(p.available_cash(), Cash::from_int(500));
        assert_eq!(p.locked_cash(), Cash::ZERO);

        let mut q = participant(0).with_shares(12);
        q.place_sell(oid(2), 12).unwrap();
        q.release(&oid(2));
        assert_eq!(q.shares(), 12);
        assert_eq!(q.locked_shares(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut p = participant(500);
        p.place_buy(oid(1), Price::from_int(5), 40).unwrap();
        p.release(&oid(1));
        p.release(&oid(1));
        assert_eq!(p.available_cash(), Cash::from_int(500));
        assert_eq!(p.locked_cash(), Cash::ZERO);
    }

    #[test]
    fn test_partial_fill_then_cancel() {
        // Fill 10 of 40, cancel the rest: only the filled notional stays
        // spent.
        let mut p = participant(400);
        p.place_buy(oid(1), Price::from_int(10), 40).unwrap();
        p.apply_fill(&buy_fill(&oid(1), 1000, 10));
        p.release(&oid(1));

        assert_eq!(p.shares(), 10);
        assert_eq!(p.locked_cash(), Cash::ZERO);
        assert_eq!(p.available_cash(), Cash::from_int(300));
    }

    #[test]
    fn test_disabled_participant_noops() {
        let mut p = participant(1000).with_shares(10);
        p.set_trading_disabled(true);

        assert_eq!(
            p.place_buy(oid(1), Price::from_int(1), 1).unwrap_err(),
            AccountError::TradingDisabled
        );
        assert_eq!(
            p.place_sell(oid(2), 1).unwrap_err(),
            AccountError::TradingDisabled
        );
        assert_eq!(p.available_cash(), Cash::from_int(1000));
        assert_eq!(p.shares(), 10);
    }

    #[test]
    fn test_pnl_counts_locked_balances() {
        let mut p = participant(1000);
        p.place_buy(oid(1), Price::from_int(10), 50).unwrap();
        // Nothing filled yet: equity unchanged.
        assert_eq!(p.pnl(Price::from_int(10)), Cash::ZERO);

        p.apply_fill(&buy_fill(&oid(1), 1000, 50));
        // Bought 50 at 10.00; at 12.00 the gain is 2.00 * 50.
        assert_eq!(p.pnl(Price::from_int(12)), Cash::from_int(100));
    }

    #[test]
    fn test_portfolio_shape() {
        let mut p = participant(1000);
        p.place_buy(oid(1), Price::from_int(10), 10).unwrap();
        p.apply_fill(&buy_fill(&oid(1), 1000, 10));

        let pf = p.portfolio(Price::from_int(10));
        assert_eq!(pf.cash, Cash::from_int(900));
        assert_eq!(pf.shares, 10);
        assert_eq!(pf.pnl, Cash::ZERO);
    }
}

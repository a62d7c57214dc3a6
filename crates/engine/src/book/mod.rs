//! Limit order book and its participant-facing wrapper.

mod matching;
mod order;
mod wrapper;

pub use matching::MatchingBook;
pub use order::{Order, Trade};
pub use wrapper::{
    BookSnapshot, CancelledOrder, ClientBook, ClientOrder, FillReport, MarketOutcome, MarketTotals,
    OrderBookWrapper,
};

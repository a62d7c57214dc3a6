//! Per-room market simulation engine.
//!
//! One [`Simulator`] per room owns the whole market: the price model, the
//! matching book and its participant-facing wrapper, every participant's
//! accounting, and the bot population. The [`news`] and [`powers`] factories
//! produce the timed events that perturb it. Everything in this crate is
//! synchronous and deterministic for a given seed; timers and transport live
//! with the server crate that drives it.

pub mod book;
pub mod bots;
pub mod generator;
pub mod news;
pub mod participant;
pub mod powers;
pub mod simulator;

pub use book::{BookSnapshot, FillReport, OrderBookWrapper};
pub use bots::{BotDescriptor, BotKind, Strategy, bot_catalogue};
pub use generator::PriceGenerator;
pub use news::{NewsEffect, NewsFactory, NewsItem};
pub use participant::{AccountError, Participant, Portfolio};
pub use powers::{
    ActivePower, PowerFactory, PowerInstance, PowerKind, PowerSpec, PowerState, PowerTarget,
};
pub use simulator::{
    CLOCK_INTERVAL_MS, OrderRequest, SimEvent, Simulator, TICK_INTERVAL_MS,
};

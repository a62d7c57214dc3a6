//! Shared domain types for the pit market simulation.
//!
//! Everything here is owned by no single room: fixed-point money, identifiers,
//! order sides, game settings, and the deterministic random number generator
//! the whole simulation is seeded from.

mod ids;
mod money;
mod rng;
mod settings;
mod side;

pub use ids::{OrderId, ParticipantId, RoomId};
pub use money::{Cash, PRICE_SCALE, Price};
pub use rng::GameRng;
pub use settings::{GameSettings, SettingsError, SettingsPatch};
pub use side::{OrderKind, Side};

//! Multi-room market simulation server.
//!
//! Rooms are spawned on demand by the [`registry::RoomRegistry`]; each runs
//! as an independent tokio task driving a [`pit_engine::Simulator`]. The
//! [`ws`] module bridges WebSocket connections onto room command queues and
//! the [`protocol`] module defines the numeric-tagged wire format.

pub mod http;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod ws;

pub use registry::RoomRegistry;
pub use room::{JoinRequest, Room, RoomCommand, RoomHandle};

//! HTTP surface: health probes and static catalogue endpoints.

use crate::registry::RoomRegistry;
use crate::ws::ws_handler;
use axum::routing::get;
use axum::{Json, Router};
use pit_engine::powers::{CATALOGUE, PowerSpec};
use pit_engine::{BotDescriptor, bot_catalogue};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(registry: Arc<RoomRegistry>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/zhealth", get(health))
        .route("/catalog/powers", get(powers_catalog))
        .route("/catalog/bots", get(bots_catalog))
        .route("/ws/{room_id}", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn health() -> &'static str {
    "ok"
}

async fn powers_catalog() -> Json<&'static [PowerSpec]> {
    Json(CATALOGUE)
}

async fn bots_catalog() -> Json<Vec<BotDescriptor>> {
    Json(bot_catalogue())
}

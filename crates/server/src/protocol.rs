//! Wire protocol: numeric-tagged JSON messages.
//!
//! Every frame is a JSON object with a numeric `type` field; the tag values
//! are part of the wire contract and must not change. Unknown tags and
//! malformed frames are dropped by the caller.

use pit_core::{GameSettings, OrderKind, ParticipantId, Price, SettingsPatch, Side};
use pit_engine::{Portfolio, PowerInstance, PowerSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Message tags. Negative and sparse values mirror the wire contract.
pub mod tags {
    pub const ID: i64 = -1;
    pub const JOIN: i64 = 0;
    pub const LEAVE: i64 = 1;
    pub const IS_ADMIN: i64 = 2;
    pub const TOGGLE_PAUSE: i64 = 3;
    pub const MESSAGE: i64 = 4;
    pub const ERROR: i64 = 5;
    pub const PING: i64 = 6;
    pub const PONG: i64 = 7;
    pub const CLOCK: i64 = 8;
    pub const ROOM_STATE: i64 = 9;
    pub const STOCK_ACTION: i64 = 10;
    pub const STOCK_MOVEMENT: i64 = 11;
    pub const PORTFOLIO_UPDATE: i64 = 12;
    pub const SHOCK: i64 = 13;
    pub const NEWS: i64 = 14;
    pub const NOTIFICATION: i64 = 15;
    pub const CLIENT_STATE: i64 = 16;
    pub const ADMIN_SETTINGS: i64 = 30;
    pub const GAME_CONCLUSION: i64 = 60;
    pub const POWER_OFFERS: i64 = 80;
    pub const POWER_SELECT: i64 = 81;
    pub const POWER_CONSUME: i64 = 82;
    pub const POWER_INVENTORY: i64 = 83;
    pub const DEBUG_PRICES: i64 = 99;
}

/// A client order submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAction {
    pub action: Side,
    pub order_type: OrderKind,
    pub quantity: u64,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Target of an admin debug shock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShockTarget {
    Intrinsic,
    Market,
}

#[derive(Debug, Clone, Deserialize)]
struct ShockBody {
    target: ShockTarget,
}

#[derive(Debug, Clone, Deserialize)]
struct AdminSettingsBody {
    settings: SettingsPatch,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatBody {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PowerSelectBody {
    index: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct PowerConsumeBody {
    id: Uuid,
}

/// Messages a client may send.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    TogglePause,
    Chat { content: String },
    Ping,
    Pong,
    StockAction(StockAction),
    Shock { target: ShockTarget },
    AdminSettings(SettingsPatch),
    PowerSelect { index: usize },
    PowerConsume { id: Uuid },
}

impl ClientMessage {
    /// Parse a frame. Malformed JSON, missing fields, and unknown tags all
    /// yield `None`; the protocol silently drops them.
    pub fn parse(text: &str) -> Option<ClientMessage> {
        let value: Value = serde_json::from_str(text).ok()?;
        let tag = value.get("type")?.as_i64()?;
        match tag {
            tags::TOGGLE_PAUSE => Some(ClientMessage::TogglePause),
            tags::MESSAGE => {
                let body: ChatBody = serde_json::from_value(value).ok()?;
                Some(ClientMessage::Chat {
                    content: body.content,
                })
            }
            tags::PING => Some(ClientMessage::Ping),
            tags::PONG => Some(ClientMessage::Pong),
            tags::STOCK_ACTION => {
                let action: StockAction = serde_json::from_value(value).ok()?;
                Some(ClientMessage::StockAction(action))
            }
            tags::SHOCK => {
                let body: ShockBody = serde_json::from_value(value).ok()?;
                Some(ClientMessage::Shock {
                    target: body.target,
                })
            }
            tags::ADMIN_SETTINGS => {
                let body: AdminSettingsBody = serde_json::from_value(value).ok()?;
                Some(ClientMessage::AdminSettings(body.settings))
            }
            tags::POWER_SELECT => {
                let body: PowerSelectBody = serde_json::from_value(value).ok()?;
                Some(ClientMessage::PowerSelect { index: body.index })
            }
            tags::POWER_CONSUME => {
                let body: PowerConsumeBody = serde_json::from_value(value).ok()?;
                Some(ClientMessage::PowerConsume { id: body.id })
            }
            _ => None,
        }
    }
}

/// A client entry inside `ROOM_STATE`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: ParticipantId,
    pub username: String,
}

/// Body of `ROOM_STATE`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateBody {
    pub paused: bool,
    pub started: bool,
    pub ended: bool,
    pub settings: GameSettings,
    pub room_id: String,
    pub clock: u64,
    pub clients: Vec<ClientInfo>,
    pub price: f64,
}

/// Portfolio as carried by `PORTFOLIO_UPDATE` and `GAME_CONCLUSION`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioBody {
    pub cash: f64,
    pub shares: u64,
    pub pnl: f64,
}

impl From<&Portfolio> for PortfolioBody {
    fn from(p: &Portfolio) -> Self {
        Self {
            cash: p.cash.as_f64(),
            shares: p.shares,
            pnl: p.pnl.as_f64(),
        }
    }
}

/// A player or bot entry in the conclusion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConclusionEntry {
    pub id: ParticipantId,
    pub cash: f64,
    pub shares: u64,
    pub pnl: f64,
}

impl From<&Portfolio> for ConclusionEntry {
    fn from(p: &Portfolio) -> Self {
        Self {
            id: p.id.clone(),
            cash: p.cash.as_f64(),
            shares: p.shares,
            pnl: p.pnl.as_f64(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

/// Messages the server sends.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    Id {
        id: String,
    },
    Join {
        room_id: String,
        id: ParticipantId,
        username: String,
    },
    Leave {
        room_id: String,
        id: ParticipantId,
    },
    IsAdmin,
    TogglePause,
    Chat {
        room_id: String,
        id: ParticipantId,
        content: String,
    },
    Error {
        message: String,
    },
    Ping,
    Pong,
    Clock {
        value: u64,
        time_left: u64,
    },
    RoomState(RoomStateBody),
    StockMovement {
        price: f64,
        bids: Vec<[f64; 2]>,
        asks: Vec<[f64; 2]>,
    },
    PortfolioUpdate {
        id: ParticipantId,
        value: PortfolioBody,
    },
    News {
        title: String,
        description: String,
        duration_ticks: u32,
        timestamp: i64,
    },
    Notification {
        level: NotificationLevel,
        title: String,
        description: Option<String>,
    },
    ClientState {
        disabled: bool,
    },
    GameConclusion {
        players: Vec<ConclusionEntry>,
        bots: Vec<ConclusionEntry>,
        volume_traded: f64,
        highest_price: f64,
        lowest_price: f64,
    },
    PowerOffers {
        offers: Vec<&'static PowerSpec>,
    },
    PowerInventory {
        powers: Vec<PowerInstance>,
    },
    DebugPrices {
        intrinsic_value: f64,
        guide_price: f64,
    },
}

impl ServerMessage {
    /// Serialize to a wire frame.
    pub fn encode(&self) -> String {
        let (tag, mut body) = match self {
            ServerMessage::Id { id } => (tags::ID, json!({ "id": id })),
            ServerMessage::Join {
                room_id,
                id,
                username,
            } => (
                tags::JOIN,
                json!({ "roomId": room_id, "id": id, "username": username }),
            ),
            ServerMessage::Leave { room_id, id } => {
                (tags::LEAVE, json!({ "roomId": room_id, "id": id }))
            }
            ServerMessage::IsAdmin => (tags::IS_ADMIN, json!({})),
            ServerMessage::TogglePause => (tags::TOGGLE_PAUSE, json!({})),
            ServerMessage::Chat {
                room_id,
                id,
                content,
            } => (
                tags::MESSAGE,
                json!({ "roomId": room_id, "id": id, "content": content }),
            ),
            ServerMessage::Error { message } => (tags::ERROR, json!({ "message": message })),
            ServerMessage::Ping => (tags::PING, json!({})),
            ServerMessage::Pong => (tags::PONG, json!({})),
            ServerMessage::Clock { value, time_left } => (
                tags::CLOCK,
                json!({ "value": value, "timeLeft": time_left }),
            ),
            ServerMessage::RoomState(body) => (
                tags::ROOM_STATE,
                serde_json::to_value(body).unwrap_or_else(|_| json!({})),
            ),
            ServerMessage::StockMovement { price, bids, asks } => (
                tags::STOCK_MOVEMENT,
                json!({ "price": price, "depth": [bids, asks] }),
            ),
            ServerMessage::PortfolioUpdate { id, value } => (
                tags::PORTFOLIO_UPDATE,
                json!({ "id": id, "value": value }),
            ),
            ServerMessage::News {
                title,
                description,
                duration_ticks,
                timestamp,
            } => (
                tags::NEWS,
                json!({
                    "title": title,
                    "description": description,
                    "durationTicks": duration_ticks,
                    "timestamp": timestamp,
                }),
            ),
            ServerMessage::Notification {
                level,
                title,
                description,
            } => (
                tags::NOTIFICATION,
                json!({ "level": level, "title": title, "description": description }),
            ),
            ServerMessage::ClientState { disabled } => {
                (tags::CLIENT_STATE, json!({ "disabled": disabled }))
            }
            ServerMessage::GameConclusion {
                players,
                bots,
                volume_traded,
                highest_price,
                lowest_price,
            } => (
                tags::GAME_CONCLUSION,
                json!({
                    "players": players,
                    "bots": bots,
                    "volumeTraded": volume_traded,
                    "highestPrice": highest_price,
                    "lowestPrice": lowest_price,
                }),
            ),
            ServerMessage::PowerOffers { offers } => {
                (tags::POWER_OFFERS, json!({ "offers": offers }))
            }
            ServerMessage::PowerInventory { powers } => {
                (tags::POWER_INVENTORY, json!({ "powers": powers }))
            }
            ServerMessage::DebugPrices {
                intrinsic_value,
                guide_price,
            } => (
                tags::DEBUG_PRICES,
                json!({ "intrinsicValue": intrinsic_value, "guidePrice": guide_price }),
            ),
        };

        if let Some(object) = body.as_object_mut() {
            object.insert("type".to_string(), Value::from(tag));
        }
        body.to_string()
    }
}

/// Depth levels converted to the wire `[price, quantity]` pairs.
pub fn depth_to_wire(levels: &[(Price, u64)]) -> Vec<[f64; 2]> {
    levels
        .iter()
        .map(|(p, q)| [p.as_f64(), *q as f64])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_of(frame: &str) -> i64 {
        let value: Value = serde_json::from_str(frame).unwrap();
        value["type"].as_i64().unwrap()
    }

    #[test]
    fn test_parse_stock_action() {
        let msg = ClientMessage::parse(
            r#"{"type":10,"action":"BUY","orderType":"LIMIT","quantity":5,"price":10.25}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::StockAction(a) => {
                assert_eq!(a.action, Side::Buy);
                assert_eq!(a.order_type, OrderKind::Limit);
                assert_eq!(a.quantity, 5);
                assert_eq!(a.price, Some(10.25));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_market_action_without_price() {
        let msg = ClientMessage::parse(
            r#"{"type":10,"action":"SELL","orderType":"MARKET","quantity":3}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::StockAction(StockAction {
                action: Side::Sell,
                order_type: OrderKind::Market,
                quantity: 3,
                price: None,
            })
        ));
    }

    #[test]
    fn test_parse_simple_tags() {
        assert!(matches!(
            ClientMessage::parse(r#"{"type":3}"#),
            Some(ClientMessage::TogglePause)
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":6}"#),
            Some(ClientMessage::Ping)
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":13,"target":"intrinsic"}"#),
            Some(ClientMessage::Shock {
                target: ShockTarget::Intrinsic
            })
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":81,"index":2}"#),
            Some(ClientMessage::PowerSelect { index: 2 })
        ));
    }

    #[test]
    fn test_parse_admin_settings() {
        let msg = ClientMessage::parse(r#"{"type":30,"settings":{"bots":5,"seed":0}}"#).unwrap();
        match msg {
            ClientMessage::AdminSettings(patch) => {
                assert_eq!(patch.bots, Some(5));
                assert_eq!(patch.seed, Some(0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_frames_dropped() {
        assert!(ClientMessage::parse("not json").is_none());
        assert!(ClientMessage::parse(r#"{"no_type":true}"#).is_none());
        assert!(ClientMessage::parse(r#"{"type":999}"#).is_none());
        // Known tag, missing required fields.
        assert!(ClientMessage::parse(r#"{"type":10}"#).is_none());
    }

    #[test]
    fn test_encode_carries_numeric_tag() {
        assert_eq!(tag_of(&ServerMessage::IsAdmin.encode()), tags::IS_ADMIN);
        assert_eq!(
            tag_of(
                &ServerMessage::Id {
                    id: "room-abc".into()
                }
                .encode()
            ),
            tags::ID
        );
        assert_eq!(
            tag_of(
                &ServerMessage::Error {
                    message: "nope".into()
                }
                .encode()
            ),
            tags::ERROR
        );
    }

    #[test]
    fn test_encode_stock_movement_depth_shape() {
        let frame = ServerMessage::StockMovement {
            price: 10.5,
            bids: vec![[10.4, 5.0], [10.3, 2.0]],
            asks: vec![[10.6, 7.0]],
        }
        .encode();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], 11);
        assert_eq!(value["price"], 10.5);
        assert_eq!(value["depth"][0][0][0], 10.4);
        assert_eq!(value["depth"][1][0][1], 7.0);
    }

    #[test]
    fn test_encode_clock_uses_wire_names() {
        let frame = ServerMessage::Clock {
            value: 30,
            time_left: 270,
        }
        .encode();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], 8);
        assert_eq!(value["value"], 30);
        assert_eq!(value["timeLeft"], 270);
    }

    #[test]
    fn test_encode_room_state_settings_shape() {
        let body = RoomStateBody {
            paused: true,
            started: false,
            ended: false,
            settings: GameSettings::default(),
            room_id: "r1".into(),
            clock: 0,
            clients: vec![ClientInfo {
                id: ParticipantId::new("c1"),
                username: "dana".into(),
            }],
            price: 1.0,
        };
        let value: Value = serde_json::from_str(&ServerMessage::RoomState(body).encode()).unwrap();
        assert_eq!(value["type"], 9);
        assert_eq!(value["settings"]["ticketName"], "AAPL");
        assert_eq!(value["settings"]["startingCash"], 10_000.0);
        assert_eq!(value["settings"]["marketVolatility"], 5.0);
        assert_eq!(value["clients"][0]["username"], "dana");
    }

    #[test]
    fn test_depth_to_wire() {
        let wire = depth_to_wire(&[(Price::from_cents(1050), 3)]);
        assert_eq!(wire, vec![[10.5, 3.0]]);
    }
}

//! Room orchestration.
//!
//! One tokio task per room owns every piece of mutable room state: the
//! simulator, the news and power factories, and the connected clients. The
//! task multiplexes the inbound command queue with the two simulation
//! timers, so all mutation happens on one logical thread and inbound
//! messages are naturally serialized. Different rooms run independently.

use crate::protocol::{
    ClientInfo, ClientMessage, ConclusionEntry, NotificationLevel, RoomStateBody, ServerMessage,
    ShockTarget, StockAction, depth_to_wire,
};
use pit_core::{Cash, GameRng, GameSettings, OrderKind, ParticipantId, Price, RoomId, SettingsPatch};
use pit_engine::powers::{PowerKind, PowerState, spec_for};
use pit_engine::{
    ActivePower, CLOCK_INTERVAL_MS, NewsEffect, NewsFactory, OrderRequest, PowerFactory,
    PowerInstance, SimEvent, Simulator, TICK_INTERVAL_MS,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Grace period before a disconnected client is removed for good.
const RECONNECT_WINDOW: Duration = Duration::from_secs(60);

/// How often the reaper sweeps expired disconnections.
const REAPER_INTERVAL: Duration = Duration::from_secs(5);

/// Depth levels carried by `STOCK_MOVEMENT`.
const DEPTH_LEVELS: usize = 20;

/// Session details of a joining or reconnecting client.
#[derive(Debug)]
pub struct JoinRequest {
    pub client_id: ParticipantId,
    pub username: String,
    pub spectator: bool,
    pub outbox: mpsc::UnboundedSender<String>,
}

/// Commands delivered to the room task.
#[derive(Debug)]
pub enum RoomCommand {
    Join(JoinRequest),
    Message {
        client_id: ParticipantId,
        message: ClientMessage,
    },
    Disconnected {
        client_id: ParticipantId,
    },
}

/// Cheap handle for delivering commands to a room task.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub room_id: RoomId,
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn send(&self, command: RoomCommand) {
        // A closed channel means the room is tearing down; drop the command.
        let _ = self.tx.send(command);
    }
}

/// Callback invoked when the room disposes itself, used by the registry to
/// drop its handle.
pub type DisposeFn = Arc<dyn Fn(&RoomId) + Send + Sync>;

struct ClientSlot {
    username: String,
    spectator: bool,
    outbox: mpsc::UnboundedSender<String>,
    connected: bool,
    disconnected_at: Option<Instant>,
    inventory: Vec<PowerInstance>,
}

pub struct Room {
    id: RoomId,
    settings: GameSettings,
    sim: Simulator,
    news: NewsFactory,
    powers: PowerFactory,
    clients: HashMap<ParticipantId, ClientSlot>,
    join_order: Vec<ParticipantId>,
    admin: Option<ParticipantId>,
    started: bool,
    paused: bool,
    ended: bool,
    on_dispose: Option<DisposeFn>,
}

impl Room {
    pub fn new(id: RoomId, on_dispose: Option<DisposeFn>) -> Self {
        let settings = GameSettings::default();
        let mut room = Self {
            id,
            sim: Simulator::new(settings.clone()),
            news: NewsFactory::new(settings.enable_random_news, news_rng(&settings)),
            powers: PowerFactory::new(settings.duration_secs(), powers_rng(&settings)),
            settings,
            clients: HashMap::new(),
            join_order: Vec::new(),
            admin: None,
            started: false,
            paused: true,
            ended: false,
            on_dispose,
        };
        room.rebuild();
        room
    }

    /// Spawn the room task and return its handle.
    pub fn spawn(id: RoomId, on_dispose: Option<DisposeFn>) -> RoomHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = RoomHandle {
            room_id: id.clone(),
            tx,
        };
        let room = Room::new(id, on_dispose);
        tokio::spawn(room.run(rx));
        handle
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RoomCommand>) {
        let mut clock = tokio::time::interval(Duration::from_millis(CLOCK_INTERVAL_MS));
        let mut market = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
        // interval() fires immediately; the reaper must not sweep an empty
        // room before its first Join command arrives.
        let mut reaper = tokio::time::interval_at(
            tokio::time::Instant::now() + REAPER_INTERVAL,
            REAPER_INTERVAL,
        );
        tracing::info!(room = %self.id, "room task started");

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                _ = clock.tick() => self.on_clock(),
                _ = market.tick() => self.on_market(),
                _ = reaper.tick() => {
                    if self.reap_disconnected() {
                        break;
                    }
                }
            }
        }

        self.dispose();
    }

    /// (Re)construct the simulator and factories from the current settings,
    /// re-registering every known human participant.
    fn rebuild(&mut self) {
        self.sim = Simulator::new(self.settings.clone());
        self.news = NewsFactory::new(self.settings.enable_random_news, news_rng(&self.settings));
        self.powers = PowerFactory::new(self.settings.duration_secs(), powers_rng(&self.settings));
        for (id, slot) in &self.clients {
            if !slot.spectator {
                self.sim.add_participant(id.clone(), slot.username.clone());
            }
        }
    }

    pub fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join(request) => self.handle_join(request),
            RoomCommand::Message { client_id, message } => self.handle_message(client_id, message),
            RoomCommand::Disconnected { client_id } => {
                if let Some(slot) = self.clients.get_mut(&client_id) {
                    slot.connected = false;
                    slot.disconnected_at = Some(Instant::now());
                    tracing::debug!(room = %self.id, client = %client_id, "client disconnected");
                }
            }
        }
    }

    fn handle_join(&mut self, request: JoinRequest) {
        let client_id = request.client_id.clone();
        if self.clients.contains_key(&client_id) {
            self.reconnect(request);
            return;
        }

        let slot = ClientSlot {
            username: request.username.clone(),
            spectator: request.spectator,
            outbox: request.outbox,
            connected: true,
            disconnected_at: None,
            inventory: Vec::new(),
        };
        self.clients.insert(client_id.clone(), slot);
        self.join_order.push(client_id.clone());

        if !request.spectator {
            self.sim
                .add_participant(client_id.clone(), request.username.clone());
            if self.admin.is_none() {
                self.admin = Some(client_id.clone());
                self.send_to(&client_id, &ServerMessage::IsAdmin);
            }
        }

        self.send_to(
            &client_id,
            &ServerMessage::Id {
                id: session_token(&self.id, &client_id),
            },
        );
        self.send_to(&client_id, &ServerMessage::RoomState(self.room_state()));
        self.broadcast(&ServerMessage::Join {
            room_id: self.id.as_str().to_string(),
            id: client_id,
            username: request.username,
        });
    }

    /// Swap in the new transport and resend everything the client needs to
    /// rebuild its view: identity, room state, portfolio, power inventory,
    /// and trading status.
    fn reconnect(&mut self, request: JoinRequest) {
        let client_id = request.client_id.clone();
        let Some(slot) = self.clients.get_mut(&client_id) else {
            return;
        };
        slot.outbox = request.outbox;
        slot.connected = true;
        slot.disconnected_at = None;
        let inventory = slot.inventory.clone();

        self.send_to(
            &client_id,
            &ServerMessage::Id {
                id: session_token(&self.id, &client_id),
            },
        );
        if self.admin.as_ref() == Some(&client_id) {
            self.send_to(&client_id, &ServerMessage::IsAdmin);
        }
        self.send_to(&client_id, &ServerMessage::RoomState(self.room_state()));
        if self.started {
            if let Some(portfolio) = self.sim.portfolio(&client_id) {
                self.send_to(
                    &client_id,
                    &ServerMessage::PortfolioUpdate {
                        id: client_id.clone(),
                        value: (&portfolio).into(),
                    },
                );
            }
        }
        self.send_to(&client_id, &ServerMessage::PowerInventory { powers: inventory });
        let disabled = self
            .sim
            .participant(&client_id)
            .is_some_and(|p| p.trading_disabled());
        self.send_to(&client_id, &ServerMessage::ClientState { disabled });
        tracing::info!(room = %self.id, client = %client_id, "client reconnected");
    }

    fn handle_message(&mut self, client_id: ParticipantId, message: ClientMessage) {
        match message {
            ClientMessage::TogglePause => self.toggle_pause(&client_id),
            ClientMessage::Chat { content } => {
                self.broadcast(&ServerMessage::Chat {
                    room_id: self.id.as_str().to_string(),
                    id: client_id,
                    content,
                });
            }
            ClientMessage::Ping => self.send_to(&client_id, &ServerMessage::Pong),
            ClientMessage::Pong => {}
            ClientMessage::StockAction(action) => self.handle_stock_action(&client_id, action),
            ClientMessage::Shock { target } => {
                // Admin-only debug control; silently ignored otherwise.
                if self.admin.as_ref() == Some(&client_id) {
                    match target {
                        ShockTarget::Intrinsic => self.sim.intrinsic_shock(),
                        ShockTarget::Market => self.sim.market_shock(),
                    }
                }
            }
            ClientMessage::AdminSettings(patch) => self.handle_settings(&client_id, patch),
            ClientMessage::PowerSelect { index } => self.handle_power_select(&client_id, index),
            ClientMessage::PowerConsume { id } => self.handle_power_consume(&client_id, id),
        }
    }

    fn toggle_pause(&mut self, client_id: &ParticipantId) {
        if self.admin.as_ref() != Some(client_id) {
            // Echo the current state back so the sender's UI self-corrects.
            self.send_to(client_id, &ServerMessage::TogglePause);
            return;
        }
        if self.ended {
            return;
        }
        self.paused = !self.paused;
        if !self.paused {
            self.started = true;
        }
        self.broadcast(&ServerMessage::TogglePause);
        self.broadcast(&ServerMessage::RoomState(self.room_state()));
    }

    fn handle_settings(&mut self, client_id: &ParticipantId, patch: SettingsPatch) {
        if self.admin.as_ref() != Some(client_id) {
            return;
        }
        if self.started && !self.paused {
            self.send_to(
                client_id,
                &ServerMessage::Error {
                    message: pit_core::SettingsError::GameRunning.to_string(),
                },
            );
            return;
        }
        self.settings.apply(patch);
        self.rebuild();
        self.broadcast(&ServerMessage::RoomState(self.room_state()));
        tracing::info!(room = %self.id, "settings updated, simulator rebuilt");
    }

    fn handle_stock_action(&mut self, client_id: &ParticipantId, action: StockAction) {
        if !self.started || self.paused || self.ended {
            return;
        }
        let Some(slot) = self.clients.get(client_id) else {
            return;
        };
        if slot.spectator {
            return;
        }

        let request = match action.order_type {
            OrderKind::Limit => {
                let Some(price) = action.price else {
                    return;
                };
                let price = Price::from_f64_round(price);
                if price < Price::MIN_TICK {
                    return;
                }
                OrderRequest::Limit {
                    side: action.action,
                    price,
                    quantity: action.quantity,
                }
            }
            OrderKind::Market => OrderRequest::Market {
                side: action.action,
                quantity: action.quantity,
            },
        };

        let events = self.sim.submit(client_id, request);
        self.dispatch_sim_events(events);
    }

    fn handle_power_select(&mut self, client_id: &ParticipantId, index: usize) {
        let Some(spec) = self.powers.take_selection(client_id, index) else {
            return;
        };
        if spec.is_instant {
            self.consume_power(spec.kind, client_id.clone());
            return;
        }
        let instance = PowerInstance {
            id: Uuid::new_v4(),
            kind: spec.kind,
        };
        if let Some(slot) = self.clients.get_mut(client_id) {
            slot.inventory.push(instance);
            let powers = slot.inventory.clone();
            self.send_to(client_id, &ServerMessage::PowerInventory { powers });
        }
    }

    fn handle_power_consume(&mut self, client_id: &ParticipantId, instance_id: Uuid) {
        let Some(slot) = self.clients.get_mut(client_id) else {
            return;
        };
        let Some(position) = slot.inventory.iter().position(|p| p.id == instance_id) else {
            return;
        };
        let instance = slot.inventory.remove(position);
        let powers = slot.inventory.clone();
        self.send_to(client_id, &ServerMessage::PowerInventory { powers });
        self.consume_power(instance.kind, client_id.clone());
    }

    fn consume_power(&mut self, kind: PowerKind, initiator: ParticipantId) {
        let spec = spec_for(kind);
        match kind {
            PowerKind::VolatilityStorm => {
                let previous = self.sim.volatility();
                self.sim.set_volatility((previous * 4.0).min(1.0));
                self.powers.activate(
                    Uuid::new_v4(),
                    kind,
                    initiator,
                    PowerState::SavedVolatility(previous),
                );
                self.broadcast(&ServerMessage::Notification {
                    level: NotificationLevel::Warning,
                    title: spec.title.to_string(),
                    description: Some("The market turns feral.".to_string()),
                });
            }
            PowerKind::RumorMill => {
                // Shock scale is drift-per-tick; the drawn magnitude is
                // normalized into it at this call site.
                let intensity = self.powers.draw_uniform() * 5.0 / 100.0;
                let item = self.news.inject(
                    "Rumor mill".to_string(),
                    "Whispers move the market.".to_string(),
                    0,
                    NewsEffect::GuideShock {
                        intensity,
                        duration_ticks: 10,
                    },
                );
                self.sim.apply_news_effect(item.effect);
                self.broadcast_news(&item.title, &item.description, item.duration_ticks);
            }
            PowerKind::CashHeritage => {
                let bonus = (self.powers.draw_uniform() * self.settings.starting_cash.as_f64())
                    .floor() as i64;
                let amount = Cash::from_int(1_000 + bonus);
                self.sim.grant_cash(&initiator, amount);
                self.broadcast(&ServerMessage::Notification {
                    level: NotificationLevel::Success,
                    title: spec.title.to_string(),
                    description: Some(format!(
                        "{} inherited {amount}.",
                        self.username_of(&initiator)
                    )),
                });
                self.send_portfolio(&initiator);
            }
            PowerKind::TheHomelessGift => {
                self.sim.grant_cash(&initiator, Cash::from_int(1));
                self.send_to(
                    &initiator,
                    &ServerMessage::Notification {
                        level: NotificationLevel::Info,
                        title: spec.title.to_string(),
                        description: Some("A stranger hands you a dollar.".to_string()),
                    },
                );
                self.send_portfolio(&initiator);
            }
            PowerKind::TheHackerDdos => {
                let victims: Vec<ParticipantId> = self
                    .join_order
                    .iter()
                    .filter(|id| {
                        **id != initiator
                            && self.clients.get(id).is_some_and(|slot| !slot.spectator)
                    })
                    .cloned()
                    .collect();
                for victim in &victims {
                    self.sim.set_trading_disabled(victim, true);
                    self.send_to(victim, &ServerMessage::ClientState { disabled: true });
                }
                self.powers.activate(
                    Uuid::new_v4(),
                    kind,
                    initiator,
                    PowerState::DisabledClients(victims),
                );
                self.broadcast(&ServerMessage::Notification {
                    level: NotificationLevel::Error,
                    title: spec.title.to_string(),
                    description: Some("Trading terminals are under attack.".to_string()),
                });
            }
        }
    }

    /// Undo a timed power. Must run exactly once per activation, whether the
    /// duration elapsed or the room is being disposed.
    fn end_power(&mut self, power: ActivePower) {
        match power.state {
            PowerState::SavedVolatility(previous) => {
                self.sim.set_volatility(previous);
                self.broadcast(&ServerMessage::Notification {
                    level: NotificationLevel::Info,
                    title: "The storm passes".to_string(),
                    description: Some("Volatility returns to normal.".to_string()),
                });
            }
            PowerState::DisabledClients(victims) => {
                for victim in &victims {
                    self.sim.set_trading_disabled(victim, false);
                    self.send_to(victim, &ServerMessage::ClientState { disabled: false });
                }
                self.broadcast(&ServerMessage::Notification {
                    level: NotificationLevel::Info,
                    title: "Systems restored".to_string(),
                    description: Some("Trading terminals are back online.".to_string()),
                });
            }
            PowerState::None => {}
        }
    }

    fn on_clock(&mut self) {
        if !self.started || self.paused || self.ended {
            return;
        }

        let events = self.sim.clock_tick();
        self.dispatch_sim_events(events);

        let news_tick = self.news.on_clock_tick(self.sim.elapsed_secs());
        if let Some(item) = news_tick.published {
            self.sim.apply_news_effect(item.effect);
            self.broadcast_news(&item.title, &item.description, item.duration_ticks);
        }

        if self.powers.briefcase_due(self.sim.elapsed_secs()) {
            let recipients: Vec<ParticipantId> = self
                .join_order
                .iter()
                .filter(|id| {
                    self.clients
                        .get(id)
                        .is_some_and(|slot| slot.connected && !slot.spectator)
                })
                .cloned()
                .collect();
            for client_id in recipients {
                let offers = self.powers.make_offer(client_id.clone());
                self.send_to(&client_id, &ServerMessage::PowerOffers { offers });
            }
        }

        for ended in self.powers.on_clock_tick() {
            self.end_power(ended);
        }
    }

    fn on_market(&mut self) {
        if !self.started || self.paused || self.ended {
            return;
        }
        let events = self.sim.market_tick();
        self.dispatch_sim_events(events);
    }

    fn dispatch_sim_events(&mut self, events: Vec<SimEvent>) {
        for event in events {
            match event {
                SimEvent::Clock {
                    elapsed_secs,
                    time_left_secs,
                } => self.broadcast(&ServerMessage::Clock {
                    value: elapsed_secs,
                    time_left: time_left_secs,
                }),
                SimEvent::DebugPrices { intrinsic, guide } => {
                    self.broadcast(&ServerMessage::DebugPrices {
                        intrinsic_value: intrinsic.as_f64(),
                        guide_price: guide.as_f64(),
                    })
                }
                SimEvent::Price(price) => self.broadcast_stock_movement(price),
                SimEvent::Portfolio(id) => {
                    if self.clients.contains_key(&id) {
                        self.send_portfolio(&id);
                    }
                }
                SimEvent::Ended => self.finish_game(),
            }
        }
    }

    fn finish_game(&mut self) {
        self.ended = true;
        let players: Vec<ConclusionEntry> = self
            .join_order
            .iter()
            .filter(|id| self.clients.get(id).is_some_and(|slot| !slot.spectator))
            .filter_map(|id| self.sim.portfolio(id))
            .map(|p| (&p).into())
            .collect();
        let bots: Vec<ConclusionEntry> = self
            .sim
            .bot_portfolios()
            .iter()
            .map(ConclusionEntry::from)
            .collect();

        self.broadcast(&ServerMessage::GameConclusion {
            players,
            bots,
            volume_traded: self.sim.volume_traded().as_f64(),
            highest_price: self
                .sim
                .highest_price()
                .unwrap_or(self.sim.market_price())
                .as_f64(),
            lowest_price: self
                .sim
                .lowest_price()
                .unwrap_or(self.sim.market_price())
                .as_f64(),
        });
        tracing::info!(room = %self.id, "game concluded");
    }

    /// Sweep clients whose reconnect window expired. Returns `true` once the
    /// room has no clients left at all.
    fn reap_disconnected(&mut self) -> bool {
        let expired: Vec<ParticipantId> = self
            .clients
            .iter()
            .filter_map(|(id, slot)| {
                slot.disconnected_at
                    .filter(|at| at.elapsed() >= RECONNECT_WINDOW)
                    .map(|_| id.clone())
            })
            .collect();

        for client_id in expired {
            self.remove_client(&client_id);
        }
        self.clients.is_empty()
    }

    fn remove_client(&mut self, client_id: &ParticipantId) {
        self.clients.remove(client_id);
        self.join_order.retain(|id| id != client_id);
        self.broadcast(&ServerMessage::Leave {
            room_id: self.id.as_str().to_string(),
            id: client_id.clone(),
        });

        if self.admin.as_ref() == Some(client_id) {
            self.admin = self
                .join_order
                .iter()
                .find(|id| self.clients.get(id).is_some_and(|slot| !slot.spectator))
                .cloned();
            if let Some(new_admin) = self.admin.clone() {
                self.send_to(&new_admin, &ServerMessage::IsAdmin);
            }
        }
        tracing::info!(room = %self.id, client = %client_id, "client removed");
    }

    /// Tear the room down: end effects of anything still active must fire,
    /// then the registry forgets the room.
    fn dispose(&mut self) {
        for power in self.powers.drain_active() {
            self.end_power(power);
        }
        self.news.drain();
        self.clients.clear();
        self.join_order.clear();
        if let Some(on_dispose) = self.on_dispose.take() {
            on_dispose(&self.id);
        }
        tracing::info!(room = %self.id, "room disposed");
    }

    fn room_state(&self) -> RoomStateBody {
        RoomStateBody {
            paused: self.paused,
            started: self.started,
            ended: self.ended,
            settings: self.settings.clone(),
            room_id: self.id.as_str().to_string(),
            clock: self.sim.elapsed_secs(),
            clients: self
                .join_order
                .iter()
                .filter_map(|id| {
                    self.clients.get(id).map(|slot| ClientInfo {
                        id: id.clone(),
                        username: slot.username.clone(),
                    })
                })
                .collect(),
            price: self.sim.market_price().as_f64(),
        }
    }

    fn broadcast_stock_movement(&self, price: Price) {
        let (bids, asks) = self.sim.depth(DEPTH_LEVELS);
        self.broadcast(&ServerMessage::StockMovement {
            price: price.as_f64(),
            bids: depth_to_wire(&bids),
            asks: depth_to_wire(&asks),
        });
    }

    fn broadcast_news(&self, title: &str, description: &str, duration_ticks: u32) {
        self.broadcast(&ServerMessage::News {
            title: title.to_string(),
            description: description.to_string(),
            duration_ticks,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
    }

    fn send_portfolio(&self, client_id: &ParticipantId) {
        if let Some(portfolio) = self.sim.portfolio(client_id) {
            self.send_to(
                client_id,
                &ServerMessage::PortfolioUpdate {
                    id: client_id.clone(),
                    value: (&portfolio).into(),
                },
            );
        }
    }

    fn username_of(&self, client_id: &ParticipantId) -> String {
        self.clients
            .get(client_id)
            .map(|slot| slot.username.clone())
            .unwrap_or_else(|| client_id.to_string())
    }

    fn send_to(&self, client_id: &ParticipantId, message: &ServerMessage) {
        if let Some(slot) = self.clients.get(client_id) {
            if slot.connected {
                let _ = slot.outbox.send(message.encode());
            }
        }
    }

    fn broadcast(&self, message: &ServerMessage) {
        let frame = message.encode();
        for slot in self.clients.values() {
            if slot.connected {
                let _ = slot.outbox.send(frame.clone());
            }
        }
    }
}

/// The reconnect token advertised in `ID` and echoed back as
/// `prevSessionData`.
pub fn session_token(room_id: &RoomId, client_id: &ParticipantId) -> String {
    format!("{room_id}-{client_id}")
}

fn news_rng(settings: &GameSettings) -> GameRng {
    GameRng::new(settings.seed.wrapping_add(1))
}

fn powers_rng(settings: &GameSettings) -> GameRng {
    GameRng::new(settings.seed.wrapping_add(2))
}
